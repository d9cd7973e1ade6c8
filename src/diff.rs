use crate::{
	attrs::update_props,
	document::{Decorate, Document, Lifecycle, NodeType},
	fragment::{Fragment, Mounted},
	teardown::{release_tree, Wait},
	vnode::{Element, Vnode},
	Result, Value,
};
use core::{
	fmt::{self, Debug, Formatter},
	future::Future,
};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Materializes vnodes through a [`Document`] and reconciles live trees against vnode changes.
///
/// Matching is strictly positional. Comments, empty text nodes (which is what [`Fragment`] placeholders are)
/// and nodes whose teardown is already underway are skipped while matching, so they don't shift positions.
///
/// # Correct Use
///
/// The live tree must not be modified between rendering a vnode and reconciling from that vnode, except through
/// this differ. Deviations are logged and repaired by recreating the affected nodes, which is slow and may
/// cause lifecycle hooks to be skipped.
///
/// Asynchronous teardown runs on the [`LocalSpawn`] given to [`DomDiffer::new`].
pub struct DomDiffer<D: Document> {
	pub(crate) document: D,
	pub(crate) decorator: Option<Rc<dyn Decorate<D>>>,
	spawner: Rc<dyn LocalSpawn>,
}

impl<D: Document> Clone for DomDiffer<D> {
	fn clone(&self) -> Self {
		Self {
			document: self.document.clone(),
			decorator: self.decorator.clone(),
			spawner: Rc::clone(&self.spawner),
		}
	}
}

impl<D: Document> Debug for DomDiffer<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DomDiffer").field("decorated", &self.decorator.is_some()).finish_non_exhaustive()
	}
}

/// The live child list a flattened vnode sequence is matched against.
enum Slots<'a, N> {
	Element(&'a N),
	Fragment(&'a Fragment<N>),
}

impl<N: Clone + PartialEq> Slots<'_, N> {
	fn get<D: Document<Node = N>>(&self, document: &D, index: usize) -> Option<N> {
		match self {
			Slots::Element(parent) => document.child_node(parent, index),
			Slots::Fragment(fragment) => fragment.get(index),
		}
	}

	fn insert<D: Document<Node = N>>(&self, document: &D, index: usize, node: N) {
		match self {
			Slots::Element(parent) => document.insert_before(parent, &node, document.child_node(parent, index).as_ref()),
			Slots::Fragment(fragment) => fragment.insert(document, index, node),
		}
	}

	fn replace<D: Document<Node = N>>(&self, document: &D, index: usize, node: N) -> Option<N> {
		match self {
			Slots::Element(parent) => {
				let old = document.child_node(parent, index)?;
				document.replace_child(parent, &node, &old);
				Some(old)
			}
			Slots::Fragment(fragment) => fragment.replace(document, index, node),
		}
	}

	/// Releases the node at `index` from positional matching while leaving it attached.
	fn take<D: Document<Node = N>>(&self, document: &D, index: usize) -> Option<N> {
		match self {
			Slots::Element(parent) => document.child_node(parent, index),
			Slots::Fragment(fragment) => fragment.take(document, index),
		}
	}
}

impl<D: Document> DomDiffer<D> {
	#[must_use]
	pub fn new(document: D, spawner: impl LocalSpawn + 'static) -> Self {
		Self {
			document,
			decorator: None,
			spawner: Rc::new(spawner),
		}
	}

	/// Installs the backend hook and attribute decorator used for all further operations.
	#[must_use]
	pub fn with_decorator(mut self, decorator: impl Decorate<D> + 'static) -> Self {
		self.decorator = Some(Rc::new(decorator));
		self
	}

	#[must_use]
	pub fn document(&self) -> &D {
		&self.document
	}

	pub(crate) fn spawn(&self, future: impl Future<Output = ()> + 'static) {
		if let Err(error) = self.spawner.spawn_local(future) {
			error!("Failed to spawn task: {:?}", error);
		}
	}

	/// Runs `node`'s hooks for `lifecycle`, spawning any future they return.
	pub(crate) fn fire(&self, node: &D::Node, lifecycle: Lifecycle) {
		for future in self.document.state(node).fire(lifecycle, node) {
			self.spawn(future);
		}
	}

	/// Patches `root`, which was materialized from `prev`, to match `next`.
	///
	/// Returns the live root from here on. That's `root` itself unless it had to be replaced.
	/// A replaced root is detached synchronously and without teardown hooks.
	///
	/// Unlike an emptied child, a root patched to `""` or `false` isn't removed. It stays in place as an empty text node
	/// that still anchors the root, and that positional matching of any surrounding content skips.
	///
	/// # Errors
	///
	/// [`Error::InvalidVnode`](`crate::Error::InvalidVnode`) if either vnode is invalid, and errors raised by components.
	/// The live tree may be partially patched in the latter case.
	#[instrument(skip(self, prev, next))]
	pub fn reconcile(&self, root: &Mounted<D::Node>, prev: &Value, next: &Value, svg: bool) -> Result<Mounted<D::Node>> {
		let prev = Vnode::normalize(prev)?;
		let next = Vnode::normalize(next)?;

		match (root, &prev, &next) {
			(Mounted::Fragment(fragment), Vnode::Fragment(n_1), Vnode::Fragment(n_2)) => {
				let span = trace_span!("Diffing fragment", "n_1.len()" = n_1.len(), "n_2.len()" = n_2.len());
				let _enter = span.enter();
				self.diff_splice(&Slots::Fragment(fragment), n_1, n_2, svg)?;
				Ok(root.clone())
			}

			(Mounted::Node(node), Vnode::Element(e_1), Vnode::Element(e_2)) if e_1.tag.eq_ignore_ascii_case(&e_2.tag) => {
				let span = trace_span!("Diffing root element", tag = %e_1.tag);
				let _enter = span.enter();
				if self.is_element(node, &e_1.tag) {
					self.update_element(node, e_1, e_2, svg)?;
					Ok(root.clone())
				} else {
					error!("Expected to update <{}> but found {:?}; Recreating the root.", e_1.tag, node);
					self.replace_root(root, &next, svg)
				}
			}

			(Mounted::Node(node), Vnode::Text(t_1), Vnode::Text(t_2)) if self.document.node_type(node) == NodeType::Text => {
				let span = trace_span!("Diffing root text");
				let _enter = span.enter();
				self.update_text(node, t_1, t_2);
				Ok(root.clone())
			}

			_ => self.replace_root(root, &next, svg),
		}
	}

	/// Patches the child nodes of `element` from the sequence `prev` to the sequence `next`.
	///
	/// A vnode that isn't a list of children counts as a sequence of one.
	///
	/// # Errors
	///
	/// As [`DomDiffer::reconcile`].
	#[instrument(skip(self, prev, next))]
	pub fn update_child_nodes(&self, element: &D::Node, prev: &Value, next: &Value) -> Result<()> {
		let prev = Vnode::normalize(prev)?;
		let next = Vnode::normalize(next)?;
		self.diff_splice(&Slots::Element(element), prev.as_slots(), next.as_slots(), false)
	}

	fn replace_root(&self, root: &Mounted<D::Node>, next: &Vnode, svg: bool) -> Result<Mounted<D::Node>> {
		let span = trace_span!("Replacing root");
		let _enter = span.enter();

		let replacement = self.create(next, svg)?;
		let anchor = root.anchor();
		match self.document.parent_node(&anchor) {
			Some(parent) => {
				for node in replacement.nodes() {
					self.document.insert_before(&parent, &node, Some(&anchor));
				}
				for old in root.nodes() {
					self.document.remove_child(&parent, &old);
					release_tree(&self.document, &old);
				}
			}
			None => trace!("Root isn't attached. Returning its replacement unmounted."),
		}
		Ok(replacement)
	}

	#[allow(clippy::similar_names)]
	#[instrument(skip(self, e_1, e_2))]
	fn update_element(&self, element: &D::Node, e_1: &Element, e_2: &Element, svg: bool) -> Result<()> {
		let svg = svg || e_2.tag == "svg";
		if update_props(&self.document, element, e_1.attrs.as_ref(), e_2.attrs.as_ref(), svg, self.decorator.as_deref()) {
			trace!("Attributes changed.");
			self.fire(element, Lifecycle::Update);
			self.fire(element, Lifecycle::Refresh);
		}
		self.diff_splice(&Slots::Element(element), &e_1.children, &e_2.children, svg)
	}

	fn update_text(&self, text: &D::Node, t_1: &str, t_2: &str) {
		let data = self.document.text(text);
		if data != t_1 {
			if cfg!(feature = "dangerous-logging") {
				error!("Unexpected text data: Expected {:?} but found {:?}. Overwriting.", t_1, data);
			} else {
				error!("Unexpected text data. Overwriting.");
			}
			self.document.set_text(text, t_2);
		} else if t_1 != t_2 {
			self.document.set_text(text, t_2);
		}
	}

	fn is_element(&self, node: &D::Node, tag: &str) -> bool {
		self.document.node_type(node) == NodeType::Element && self.document.tag_name(node).eq_ignore_ascii_case(tag)
	}

	fn is_skippable(&self, node: &D::Node) -> bool {
		match self.document.node_type(node) {
			NodeType::Comment | NodeType::Other => true,
			NodeType::Text if self.document.text(node).is_empty() => true,
			NodeType::Text | NodeType::Element => self.document.state(node).is_dirty(),
		}
	}

	/// Advances `i` past skippable nodes and returns the next matchable one, if any.
	fn seek(&self, slots: &Slots<'_, D::Node>, i: &mut usize) -> Option<D::Node> {
		loop {
			let node = slots.get(&self.document, *i)?;
			if !self.is_skippable(&node) {
				break Some(node);
			}
			trace!("Skipping {:?}.", node);
			*i += 1;
		}
	}

	/// Matches the flattened sequences `vdom_a` and `vdom_b` slot by slot, starting at the first live node of `slots`.
	#[instrument(skip(self, slots, vdom_a, vdom_b))]
	fn diff_splice(&self, slots: &Slots<'_, D::Node>, vdom_a: &[Vnode], vdom_b: &[Vnode], svg: bool) -> Result<()> {
		let mut i = 0;
		let mut vdom_a = vdom_a.iter();
		let mut vdom_b = vdom_b.iter();

		loop {
			match (vdom_a.next(), vdom_b.next()) {
				(None, None) => break,

				(None | Some(Vnode::Empty), None | Some(Vnode::Empty)) => trace!("Empty slot."),

				(None | Some(Vnode::Empty), Some(n_2)) => {
					let span = trace_span!("Creating node");
					let _enter = span.enter();
					self.insert(slots, &mut i, n_2, svg)?;
				}

				(Some(_), None | Some(Vnode::Empty)) => {
					let span = trace_span!("Removing node");
					let _enter = span.enter();
					if self.seek(slots, &mut i).is_none() {
						error!("Expected to remove node beyond end of the live child list. Skipping.");
						continue;
					}
					if let Some(node) = slots.take(&self.document, i) {
						self.discard(node);
					}
				}

				(Some(n_1), Some(n_2)) => self.diff_node(slots, &mut i, n_1, n_2, svg)?,
			}
		}

		Ok(())
	}

	fn diff_node(&self, slots: &Slots<'_, D::Node>, i: &mut usize, n_1: &Vnode, n_2: &Vnode, svg: bool) -> Result<()> {
		match (n_1, n_2) {
			(Vnode::Text(t_1), Vnode::Text(t_2)) => {
				let span = trace_span!("Diffing text node");
				let _enter = span.enter();
				match self.seek(slots, i) {
					None => {
						error!("Expected text beyond end of the live child list. Switching to insertions.");
						self.insert(slots, i, n_2, svg)
					}
					Some(node) if self.document.node_type(&node) == NodeType::Text => {
						self.update_text(&node, t_1, t_2);
						*i += 1;
						Ok(())
					}
					Some(node) => {
						error!("Expected to update text but found {:?}; Recreating the node.", node);
						self.replace(slots, i, n_2, svg)
					}
				}
			}

			(Vnode::Element(e_1), Vnode::Element(e_2)) if e_1.tag.eq_ignore_ascii_case(&e_2.tag) => {
				let span = trace_span!("Diffing element", tag = %e_1.tag);
				let _enter = span.enter();
				match self.seek(slots, i) {
					None => {
						error!("Expected <{}> beyond end of the live child list. Switching to insertions.", e_1.tag);
						self.insert(slots, i, n_2, svg)
					}
					Some(node) if self.is_element(&node, &e_1.tag) => {
						self.update_element(&node, e_1, e_2, svg)?;
						*i += 1;
						Ok(())
					}
					Some(node) => {
						error!("Expected to update <{}> but found {:?}; Recreating the node.", e_1.tag, node);
						self.replace(slots, i, n_2, svg)
					}
				}
			}

			// Mismatching nodes: Replace.
			(n_1, n_2) => {
				let span = trace_span!("Replacing mismatching");
				let _enter = span.enter();
				if STATIC_MAX_LEVEL >= Level::WARN {
					if let (Vnode::Fragment(_), _) | (_, Vnode::Fragment(_)) = (n_1, n_2) {
						warn!("Unexpected nested fragment in a flattened child list.");
					}
				}
				match self.seek(slots, i) {
					None => {
						error!("Expected node beyond end of the live child list. Switching to insertions.");
						self.insert(slots, i, n_2, svg)
					}
					Some(_) => self.replace(slots, i, n_2, svg),
				}
			}
		}
	}

	fn insert(&self, slots: &Slots<'_, D::Node>, i: &mut usize, vnode: &Vnode, svg: bool) -> Result<()> {
		if let Some(node) = self.create_node(vnode, svg)? {
			slots.insert(&self.document, *i, node);
			*i += 1;
		}
		Ok(())
	}

	fn replace(&self, slots: &Slots<'_, D::Node>, i: &mut usize, vnode: &Vnode, svg: bool) -> Result<()> {
		match self.create_node(vnode, svg)? {
			Some(node) => {
				if let Some(old) = slots.replace(&self.document, *i, node) {
					release_tree(&self.document, &old);
				}
				*i += 1;
			}
			None => {
				if let Some(old) = slots.take(&self.document, *i) {
					self.discard(old);
				}
			}
		}
		Ok(())
	}

	/// Starts tearing `node` down in the background. It's skipped by matching from now on.
	fn discard(&self, node: D::Node) {
		let teardown = self.destroy(&Mounted::Node(node), Wait::immediate());
		self.spawn(async move {
			let outcome = teardown.await;
			trace!("Background teardown finished: {:?}", outcome);
		});
	}
}
