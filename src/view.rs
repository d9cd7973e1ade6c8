//! Stateful rendering on top of [`DomDiffer`].
//!
//! A [`View`] owns a state mapping, renders it through a user function and reconciles its mounted root after every
//! state change. Actions are [`Func`]s called with `[state, List(args)]`; a mapping they return is merged into the
//! state and triggers a re-render.
//!
//! A view can also be embedded into a larger tree through [`Thunk::wrap`](`crate::Thunk::wrap`). It then tracks its
//! root element through a [`NodeRef`] instead of owning a mount.

use crate::{
	document::Document,
	fragment::Mounted,
	teardown::{next_tick, Teardown, Wait},
	vnode::is_vnode,
	Attrs, DomDiffer, Error, Func, NodeRef, Result, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use futures::{
	future::{join_all, LocalBoxFuture},
	FutureExt as _,
};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span};

type Render<D> = Box<dyn Fn(&Attrs, &Actions<D>) -> Result<Value>>;
type Subscriber = Rc<dyn Fn(&Attrs) -> LocalBoxFuture<'static, ()>>;

struct Inner<D: Document> {
	differ: DomDiffer<D>,
	render: Render<D>,
	actions: Attrs,
	state: RefCell<Attrs>,
	vnode: RefCell<Value>,
	root: RefCell<Option<Mounted<D::Node>>>,
	anchor: RefCell<Option<NodeRef>>,
	subscribers: RefCell<Vec<(usize, Subscriber)>>,
	next_subscriber: Cell<usize>,
}

/// A mountable, stateful render function.
///
/// Clones share the same view.
pub struct View<D: Document>(Rc<Inner<D>>);

impl<D: Document> Clone for View<D> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<D: Document> Debug for View<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("View")
			.field("actions", &self.0.actions.keys().collect::<Vec<_>>())
			.field("mounted", &self.0.root.borrow().is_some())
			.finish_non_exhaustive()
	}
}

/// The view's actions as seen from its render function.
///
/// Doesn't keep the view alive.
pub struct Actions<D: Document>(Weak<Inner<D>>);

impl<D: Document> Clone for Actions<D> {
	fn clone(&self) -> Self {
		Self(Weak::clone(&self.0))
	}
}

impl<D: Document> Debug for Actions<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("Actions(..)")
	}
}

impl<D: Document> View<D> {
	/// # Errors
	///
	/// [`Error::InvalidComponent`] if any of `actions` isn't a function.
	pub fn new(differ: DomDiffer<D>, state: Attrs, actions: Attrs, render: impl Fn(&Attrs, &Actions<D>) -> Result<Value> + 'static) -> Result<Self> {
		if let Some((name, value)) = actions.iter().find(|(_, action)| action.as_func().is_none()) {
			return Err(Error::InvalidComponent {
				name: name.to_owned(),
				value: value.to_string(),
			});
		}

		Ok(Self(Rc::new(Inner {
			differ,
			render: Box::new(render),
			actions,
			state: RefCell::new(state),
			vnode: RefCell::default(),
			root: RefCell::default(),
			anchor: RefCell::default(),
			subscribers: RefCell::default(),
			next_subscriber: Cell::new(0),
		})))
	}

	#[must_use]
	pub fn actions(&self) -> Actions<D> {
		Actions(Rc::downgrade(&self.0))
	}

	/// A snapshot of the current state.
	#[must_use]
	pub fn state(&self) -> Attrs {
		self.0.state.borrow().clone()
	}

	/// The mounted root, if any.
	#[must_use]
	pub fn target(&self) -> Option<Mounted<D::Node>> {
		match &*self.0.anchor.borrow() {
			Some(anchor) => anchor.current::<D::Node>().map(Mounted::Node),
			None => self.0.root.borrow().clone(),
		}
	}

	/// Renders the current state and appends the result to `target`.
	///
	/// # Errors
	///
	/// Errors raised by the render function, and as [`DomDiffer::mount`].
	#[instrument(skip(self))]
	pub fn mount(&self, target: &D::Node) -> Result<Mounted<D::Node>> {
		self.0.anchor.borrow_mut().take();
		let vnode = self.render()?;
		let root = self.0.differ.mount(target, &vnode)?;
		*self.0.vnode.borrow_mut() = vnode;
		*self.0.root.borrow_mut() = Some(root.clone());
		Ok(root)
	}

	/// Merges `changes` into the state, then re-renders once all subscribers have seen it.
	///
	/// # Errors
	///
	/// As [`View::mount`].
	pub fn patch(&self, changes: Attrs) -> LocalBoxFuture<'static, Result<()>> {
		self.0.state.borrow_mut().merge(changes);
		self.sync()
	}

	/// Calls the action `name` with the current state and `args`.
	///
	/// Resolves to the action's result, after the re-render if that result was a mapping.
	///
	/// # Errors
	///
	/// [`Error::InvalidComponent`] if there is no such action, and errors raised by the action or during re-rendering.
	pub fn dispatch(&self, name: &str, args: Vec<Value>) -> LocalBoxFuture<'static, Result<Value>> {
		let span = trace_span!("Dispatching action", name);
		let _enter = span.enter();

		let action = match self.0.actions.get(name).and_then(Value::as_func) {
			Some(action) => action.clone(),
			None => {
				let error = Error::InvalidComponent {
					name: name.to_owned(),
					value: Value::Null.to_string(),
				};
				return async move { Err(error) }.boxed_local();
			}
		};

		let state = self.state();
		let result = match action.call(&[Value::Map(state), Value::List(args)]) {
			Ok(result) => result,
			Err(error) => return async move { Err(error) }.boxed_local(),
		};

		match result {
			Value::Map(changes) => {
				trace!("Action returned state changes.");
				let patched = self.patch(changes.clone());
				async move {
					patched.await?;
					Ok(Value::Map(changes))
				}
				.boxed_local()
			}
			result => async move { Ok(result) }.boxed_local(),
		}
	}

	/// Calls `subscriber` with the current state now and before every re-render.
	///
	/// Re-renders wait for the futures returned by all subscribers.
	pub fn subscribe(&self, subscriber: impl Fn(&Attrs) -> LocalBoxFuture<'static, ()> + 'static) -> Subscription<D> {
		let id = self.0.next_subscriber.get();
		self.0.next_subscriber.set(id + 1);

		let subscriber: Subscriber = Rc::new(subscriber);
		self.0.differ.spawn(subscriber(&self.state()));
		self.0.subscribers.borrow_mut().push((id, subscriber));

		Subscription { view: Rc::downgrade(&self.0), id }
	}

	/// Tears the mounted root down, or returns [`None`] if nothing is mounted.
	#[must_use]
	pub fn unmount(&self, wait: Wait) -> Option<LocalBoxFuture<'static, Teardown>> {
		let root = self.target()?;
		self.0.root.borrow_mut().take();
		self.0.anchor.borrow_mut().take();
		*self.0.vnode.borrow_mut() = Value::Null;
		Some(self.0.differ.destroy(&root, wait))
	}

	/// Calls `f` once the executor had a chance to run everything already queued, such as pending removals.
	pub fn defer<T: 'static>(&self, f: impl FnOnce() -> T + 'static) -> LocalBoxFuture<'static, T> {
		defer(f)
	}

	/// Renders the view for embedding into a tree it doesn't mount itself.
	/// From now on its root is whatever element `anchor` receives.
	pub(crate) fn embed(&self, anchor: NodeRef) -> Result<Value> {
		*self.0.root.borrow_mut() = None;
		*self.0.anchor.borrow_mut() = Some(anchor);
		let vnode = self.render()?;
		*self.0.vnode.borrow_mut() = vnode.clone();
		Ok(vnode)
	}

	fn render(&self) -> Result<Value> {
		let state = self.state();
		let vnode = (self.0.render)(&state, &self.actions())?;
		match &*self.0.anchor.borrow() {
			Some(anchor) => with_ref(vnode, anchor.clone()),
			None => Ok(vnode),
		}
	}

	fn sync(&self) -> LocalBoxFuture<'static, Result<()>> {
		let view = self.clone();
		async move {
			let state = view.state();
			let subscribers = view.0.subscribers.borrow().iter().map(|(_, subscriber)| Rc::clone(subscriber)).collect::<Vec<_>>();
			join_all(subscribers.iter().map(|subscriber| subscriber(&state))).await;

			let root = match view.target() {
				Some(root) => root,
				None => {
					trace!("Not mounted. Skipping re-render.");
					return Ok(());
				}
			};

			let span = trace_span!("Re-rendering view");
			let _enter = span.enter();
			let next = view.render()?;
			let prev = view.0.vnode.replace(next.clone());
			let root = view.0.differ.reconcile(&root, &prev, &next, false)?;
			if view.0.anchor.borrow().is_none() {
				*view.0.root.borrow_mut() = Some(root);
			}
			Ok(())
		}
		.boxed_local()
	}
}

impl<D: Document> Actions<D> {
	/// As [`View::dispatch`].
	///
	/// # Errors
	///
	/// [`Error::Callback`] if the view is gone, otherwise as [`View::dispatch`].
	pub fn dispatch(&self, name: &str, args: Vec<Value>) -> LocalBoxFuture<'static, Result<Value>> {
		match self.0.upgrade() {
			Some(inner) => View(inner).dispatch(name, args),
			None => async { Err(Error::callback("The view was dropped.")) }.boxed_local(),
		}
	}

	/// A function that dispatches `name` in the background with whatever it's called with as arguments,
	/// fit for use as an event handler attribute.
	#[must_use]
	pub fn handler(&self, name: &str) -> Func {
		let actions = self.clone();
		let name = name.to_owned();
		Func::new(move |args| {
			let view = match actions.0.upgrade() {
				Some(inner) => View(inner),
				None => return Err(Error::callback("The view was dropped.")),
			};
			let dispatched = view.dispatch(&name, args.to_vec());
			let name = name.clone();
			view.0.differ.spawn(async move {
				if let Err(error) = dispatched.await {
					error!("Action {} failed: {}", name, error);
				}
			});
			Ok(Value::Null)
		})
	}
}

/// Returned by [`View::subscribe`].
pub struct Subscription<D: Document> {
	view: Weak<Inner<D>>,
	id: usize,
}

impl<D: Document> Debug for Subscription<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
	}
}

impl<D: Document> Subscription<D> {
	pub fn unsubscribe(self) {
		if let Some(inner) = self.view.upgrade() {
			inner.subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
		}
	}
}

/// Calls `f` after yielding to the executor once.
pub(crate) fn defer<T: 'static>(f: impl FnOnce() -> T + 'static) -> LocalBoxFuture<'static, T> {
	async move {
		next_tick().await;
		f()
	}
	.boxed_local()
}

/// Adds `ref` to the attributes of the element `vnode`.
fn with_ref(vnode: Value, anchor: NodeRef) -> Result<Value> {
	let is_element = matches!(&vnode, Value::List(items) if matches!(items.first(), Some(Value::Str(_)))) && is_vnode(&vnode);
	let mut items = match vnode {
		Value::List(items) if is_element => items,
		vnode => return Err(Error::InvalidVnode(format!("Embedded views must render an element, not {}", vnode))),
	};
	match items.get_mut(1) {
		Some(Value::Map(attrs)) => {
			attrs.insert("ref", anchor);
		}
		Some(slot @ Value::Null) => *slot = Attrs::from_iter([("ref", anchor)]).into(),
		_ => items.insert(1, Attrs::from_iter([("ref", anchor)]).into()),
	}
	Ok(Value::List(items))
}
