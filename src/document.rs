//! The backend node contract.
//!
//! [`DomDiffer`](`crate::DomDiffer`) only ever talks to live nodes through a [`Document`].
//! [`MemoryDocument`](`crate::memory::MemoryDocument`) implements it in-process, `WebDocument` over `web-sys` on `wasm32`.

use crate::{vnode::Vnode, Attrs, Func, Result, Value};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use futures::future::LocalBoxFuture;
use hashbrown::HashMap;
use std::rc::Rc;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	Element,
	Text,
	Comment,
	Other,
}

pub trait Document: Clone + 'static {
	type Node: Clone + PartialEq + Debug + 'static;

	fn create_element(&self, tag: &str, svg: bool) -> Self::Node;
	fn create_text_node(&self, text: &str) -> Self::Node;
	fn create_comment(&self, data: &str) -> Self::Node;

	fn node_type(&self, node: &Self::Node) -> NodeType;
	/// As reported by the backend, which may be upper-cased for HTML elements.
	fn tag_name(&self, node: &Self::Node) -> String;
	/// Character data of text and comment nodes, empty for anything else.
	fn text(&self, node: &Self::Node) -> String;
	fn set_text(&self, node: &Self::Node, text: &str);

	fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;
	fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&self, node: &Self::Node, name: &str);
	fn set_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str, value: &str);
	fn remove_attribute_ns(&self, node: &Self::Node, namespace: &str, local_name: &str);

	fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;
	fn child_node(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
		self.child_nodes(node).into_iter().nth(index)
	}
	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Inserts `child` before `reference`, or appends it if there is none.
	///
	/// `child` is detached from its current parent first.
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>);
	fn append_child(&self, parent: &Self::Node, child: &Self::Node) {
		self.insert_before(parent, child, None);
	}
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node);
	fn replace_child(&self, parent: &Self::Node, new: &Self::Node, old: &Self::Node) {
		self.insert_before(parent, new, Some(old));
		self.remove_child(parent, old);
	}

	fn add_class(&self, node: &Self::Node, class: &str) {
		let current = self.get_attribute(node, "class").unwrap_or_default();
		if !current.split_whitespace().any(|c| c == class) {
			let next = if current.trim().is_empty() { class.to_owned() } else { format!("{} {}", current.trim(), class) };
			self.set_attribute(node, "class", &next);
		}
	}
	fn remove_class(&self, node: &Self::Node, class: &str) {
		if let Some(current) = self.get_attribute(node, "class") {
			let next = current.split_whitespace().filter(|c| *c != class).collect::<Vec<_>>().join(" ");
			if next.is_empty() {
				self.remove_attribute(node, "class");
			} else if next != current {
				self.set_attribute(node, "class", &next);
			}
		}
	}

	/// Starts routing `event` on `node` to the handler in its [`NodeState::events`] table.
	fn listen(&self, node: &Self::Node, event: &str);
	fn unlisten(&self, node: &Self::Node, event: &str);

	/// The engine's bookkeeping for `node`. Repeated calls return the same state.
	fn state(&self, node: &Self::Node) -> Rc<NodeState<Self::Node>>;

	/// Called once `node` has left the tree for good.
	fn release(&self, _node: &Self::Node) {}
}

/// Lifecycle points a node can be hooked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
	/// After construction and attribute assignment, before children are appended.
	Create,
	/// Attributes changed during a same-tag update.
	Update,
	/// First step of teardown.
	Destroy,
	/// Right after [`Lifecycle::Create`].
	Enter,
	/// Last step of teardown, right before detaching.
	Exit,
	/// Unbinds whatever was bound during creation.
	Teardown,
	/// Fires after [`Lifecycle::Update`].
	Refresh,
}

/// A lifecycle hook. A returned future is awaited if the hook is part of teardown and spawned otherwise.
pub type Hook<N> = Rc<dyn Fn(&N) -> Option<LocalBoxFuture<'static, ()>>>;

/// Per-node bookkeeping: lifecycle hooks, event handlers and the teardown flag.
pub struct NodeState<N> {
	hooks: RefCell<HashMap<Lifecycle, Vec<Hook<N>>>>,
	callbacks: RefCell<HashMap<Lifecycle, Func>>,
	events: RefCell<HashMap<String, Func>>,
	dirty: Cell<bool>,
}

impl<N> Default for NodeState<N> {
	fn default() -> Self {
		Self {
			hooks: RefCell::default(),
			callbacks: RefCell::default(),
			events: RefCell::default(),
			dirty: Cell::new(false),
		}
	}
}

impl<N> Debug for NodeState<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeState")
			.field("hooks", &self.hooks.borrow().iter().map(|(lifecycle, hooks)| (*lifecycle, hooks.len())).collect::<Vec<_>>())
			.field("callbacks", &self.callbacks.borrow().keys().collect::<Vec<_>>())
			.field("events", &self.events.borrow().keys().collect::<Vec<_>>())
			.field("dirty", &self.dirty.get())
			.finish()
	}
}

impl<N> NodeState<N> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on(&self, lifecycle: Lifecycle, hook: impl Fn(&N) -> Option<LocalBoxFuture<'static, ()>> + 'static) {
		self.hooks.borrow_mut().entry(lifecycle).or_default().push(Rc::new(hook));
	}

	#[must_use]
	pub fn has(&self, lifecycle: Lifecycle) -> bool {
		self.hooks.borrow().get(&lifecycle).map_or(false, |hooks| !hooks.is_empty())
	}

	/// Runs the hooks registered for `lifecycle` in registration order.
	///
	/// Hooks may register further hooks while running.
	pub fn fire(&self, lifecycle: Lifecycle, node: &N) -> Vec<LocalBoxFuture<'static, ()>> {
		let hooks = self.hooks.borrow().get(&lifecycle).cloned().unwrap_or_default();
		hooks.iter().filter_map(|hook| hook(node)).collect()
	}

	/// Swaps the user callback bound to `lifecycle`, returning the previous one.
	///
	/// Unlike [`NodeState::on`], this holds at most one function per lifecycle.
	pub fn set_callback(&self, lifecycle: Lifecycle, callback: Option<Func>) -> Option<Func> {
		let mut callbacks = self.callbacks.borrow_mut();
		match callback {
			Some(callback) => callbacks.insert(lifecycle, callback),
			None => callbacks.remove(&lifecycle),
		}
	}

	#[must_use]
	pub fn callback(&self, lifecycle: Lifecycle) -> Option<Func> {
		self.callbacks.borrow().get(&lifecycle).cloned()
	}

	pub fn set_event(&self, event: &str, handler: Option<Func>) -> Option<Func> {
		let mut events = self.events.borrow_mut();
		match handler {
			Some(handler) => events.insert(event.to_owned(), handler),
			None => events.remove(event),
		}
	}

	#[must_use]
	pub fn event(&self, event: &str) -> Option<Func> {
		self.events.borrow().get(event).cloned()
	}

	#[must_use]
	pub fn events(&self) -> Vec<String> {
		self.events.borrow().keys().cloned().collect()
	}

	/// Set once teardown has been issued. Such nodes are skipped by positional matching.
	#[must_use]
	pub fn is_dirty(&self) -> bool {
		self.dirty.get()
	}

	pub fn mark_dirty(&self) {
		self.dirty.set(true);
	}
}

/// What [`Decorate::element`] made of a freshly constructed element.
pub enum Created<N> {
	/// Continue with this node, usually the one that was passed in.
	Node(N),
	/// Discard the element and materialize this vnode in its place.
	Render(Value),
}

/// Optional backend hook and attribute decorator.
pub trait Decorate<D: Document> {
	/// Runs once per element right after construction.
	///
	/// # Errors
	///
	/// Errors are passed on to the caller of the materializing operation.
	fn element(&self, _document: &D, element: D::Node, _tag: &str, _attrs: Option<&Attrs>, _children: &[Vnode]) -> Result<Created<D::Node>> {
		Ok(Created::Node(element))
	}

	/// Resolves a non-scalar attribute value into the literal one to write, or [`None`] to remove the attribute.
	fn attribute(&self, _document: &D, _element: &D::Node, _key: &str, _value: &Value) -> Option<Value> {
		None
	}
}
