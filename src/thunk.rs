//! A mount point for trees that embed stateful [`View`]s.
//!
//! ```
//! use futures::executor::LocalPool;
//! use sprig_dom::{attrs, decorate, list, memory::MemoryDocument, DomDiffer, Thunk, View, Wait};
//!
//! let document = MemoryDocument::new();
//! let mut pool = LocalPool::new();
//! let differ = DomDiffer::new(document.clone(), pool.spawner()).with_decorator(decorate::defaults());
//!
//! let thunk = Thunk::new(differ.clone(), None, false);
//! let badge = thunk.wrap("Badge", move |props, _children| {
//! 	View::new(differ.clone(), props.cloned().unwrap_or_default(), attrs! {}, |state, _| {
//! 		Ok(list!["b", (), state.get("label").cloned().unwrap_or_default()])
//! 	})
//! });
//!
//! pool.run_until(thunk.mount(&document.body(), Some(list!["p", (), list![badge, attrs! { "label" => "new" }]]))).unwrap();
//! assert_eq!(document.body().inner_html(), "<p><b>new</b></p>");
//! assert_eq!(thunk.embedded("Badge").len(), 1);
//!
//! pool.run_until(thunk.unmount(Wait::immediate()));
//! assert_eq!(document.body().inner_html(), "");
//! ```

use crate::{
	document::Document,
	fragment::Mounted,
	teardown::{Teardown, Wait},
	view::defer,
	vnode::fix_tree,
	Attrs, DomDiffer, Error, Func, NodeRef, Result, Value, View,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use futures::{
	future::{join_all, LocalBoxFuture},
	FutureExt as _,
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace, trace_span};

struct Inner<D: Document> {
	differ: DomDiffer<D>,
	svg: bool,
	vnode: RefCell<Value>,
	rendered: RefCell<Value>,
	source: RefCell<Option<Mounted<D::Node>>>,
	refs: RefCell<HashMap<String, Vec<View<D>>>>,
	rendering: RefCell<Option<HashMap<String, Vec<View<D>>>>>,
}

/// Renders a vnode like [`DomDiffer::mount`], and keeps track of the views embedded in it through [`Thunk::wrap`].
///
/// Components are expanded once per render, and the expanded tree is what gets reconciled.
/// Embedded views re-render their own subtree when their state changes.
/// Each render of the thunk instantiates them anew, so the ones tracked are always those of the latest render.
///
/// Clones share the same thunk.
pub struct Thunk<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for Thunk<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> Debug for Thunk<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Thunk")
			.field("svg", &self.0.svg)
			.field("mounted", &self.0.source.borrow().is_some())
			.field("refs", &self.0.refs.borrow().iter().map(|(name, views)| (name.clone(), views.len())).collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl<D: Document> Thunk<D> {
	/// `vnode` defaults to an empty `<div>`.
	#[must_use]
	pub fn new(differ: DomDiffer<D>, vnode: Option<Value>, svg: bool) -> Self {
		Self(Rc::new(Inner {
			differ,
			svg,
			vnode: RefCell::new(vnode.unwrap_or_else(|| Value::List(vec!["div".into(), Value::Null]))),
			rendered: RefCell::default(),
			source: RefCell::default(),
			refs: RefCell::default(),
			rendering: RefCell::default(),
		}))
	}

	/// The mounted root, if any.
	#[must_use]
	pub fn target(&self) -> Option<Mounted<D::Node>> {
		self.0.source.borrow().clone()
	}

	/// The views currently embedded under `name`, in render order.
	#[must_use]
	pub fn embedded(&self, name: &str) -> Vec<View<D>> {
		self.0.refs.borrow().get(name).cloned().unwrap_or_default()
	}

	/// Unmounts whatever is mounted, then renders `vnode` (or the previous one) into `target`.
	///
	/// # Errors
	///
	/// As [`DomDiffer::mount`], including errors raised by embedded views.
	pub fn mount(&self, target: &D::Node, vnode: Option<Value>) -> LocalBoxFuture<'static, Result<Mounted<D::Node>>> {
		let thunk = self.clone();
		let target = target.clone();
		async move {
			thunk.unmount(Wait::immediate()).await;
			if let Some(vnode) = vnode {
				*thunk.0.vnode.borrow_mut() = vnode;
			}

			let span = trace_span!("Mounting thunk");
			let _enter = span.enter();
			let vnode = thunk.0.vnode.borrow().clone();
			let rendered = thunk.rendering(|| fix_tree(&vnode))?;
			let root = thunk.0.differ.mount(&target, &rendered)?;
			*thunk.0.rendered.borrow_mut() = rendered;
			*thunk.0.source.borrow_mut() = Some(root.clone());
			Ok(root)
		}
		.boxed_local()
	}

	/// Reconciles the mounted tree to `next`.
	///
	/// # Errors
	///
	/// [`Error::Callback`] if nothing is mounted, otherwise as [`DomDiffer::reconcile`].
	#[instrument(skip(self, next))]
	pub fn patch(&self, next: Value) -> Result<Mounted<D::Node>> {
		let root = self.target().ok_or_else(|| Error::callback("The thunk isn't mounted."))?;
		let rendered = self.rendering(|| fix_tree(&next))?;
		let prev = self.0.rendered.replace(rendered.clone());
		*self.0.vnode.borrow_mut() = next;
		let root = self.0.differ.reconcile(&root, &prev, &rendered, self.0.svg)?;
		*self.0.source.borrow_mut() = Some(root.clone());
		Ok(root)
	}

	/// Unmounts all embedded views, then tears down the mounted root with `wait`.
	///
	/// Resolves to [`None`] if nothing was mounted.
	pub fn unmount(&self, wait: Wait) -> LocalBoxFuture<'static, Option<Teardown>> {
		let views = self.0.refs.take().into_iter().flat_map(|(_, views)| views).collect::<Vec<_>>();
		let source = self.0.source.borrow_mut().take();
		*self.0.rendered.borrow_mut() = Value::Null;
		let differ = self.0.differ.clone();
		async move {
			join_all(views.iter().filter_map(|view| view.unmount(Wait::immediate()))).await;

			let source = source?;
			let document = differ.document();
			if source.nodes().iter().all(|node| document.parent_node(node).is_none()) {
				trace!("Root went away with an embedded view.");
				return Some(Teardown::Detached);
			}
			Some(differ.destroy(&source, wait).await)
		}
		.boxed_local()
	}

	/// Turns a view factory into a component.
	///
	/// Every call builds a view from the component's attributes and children and embeds its rendering.
	/// The view must render an element, whose `ref` attribute is taken over for tracking.
	/// It's listed under `name` until the next render of this thunk, or its unmounting.
	#[must_use]
	pub fn wrap(&self, name: &str, factory: impl Fn(Option<&Attrs>, &[Value]) -> Result<View<D>> + 'static) -> Func {
		let thunk = Rc::downgrade(&self.0);
		let name = name.to_owned();
		Func::component(move |props, children| {
			let thunk = Weak::upgrade(&thunk).ok_or_else(|| Error::callback("The thunk was dropped."))?;
			let view = factory(props, children)?;
			let vnode = view.embed(NodeRef::new())?;

			let span = trace_span!("Embedding view", name = %name);
			let _enter = span.enter();
			match &mut *thunk.rendering.borrow_mut() {
				Some(rendered) => rendered.entry(name.clone()).or_default().push(view),
				None => {
					trace!("Rendered outside of a thunk render. Tracking anyway.");
					thunk.refs.borrow_mut().entry(name.clone()).or_default().push(view);
				}
			}
			Ok(vnode)
		})
	}

	/// Calls `f` once the executor had a chance to run everything already queued.
	pub fn defer<T: 'static>(&self, f: impl FnOnce() -> T + 'static) -> LocalBoxFuture<'static, T> {
		defer(f)
	}

	/// Runs `render` while collecting embedded views, which replace the tracked ones if it succeeds.
	fn rendering<T>(&self, render: impl FnOnce() -> Result<T>) -> Result<T> {
		*self.0.rendering.borrow_mut() = Some(HashMap::new());
		let result = render();
		let rendered = self.0.rendering.borrow_mut().take().unwrap_or_default();
		if result.is_ok() {
			*self.0.refs.borrow_mut() = rendered;
		}
		result
	}
}
