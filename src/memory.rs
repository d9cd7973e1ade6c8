//! An in-process [`Document`], for rendering without a browser and for tests.
//!
//! ```
//! use sprig_dom::{memory::MemoryDocument, Document as _};
//!
//! let document = MemoryDocument::new();
//! let body = document.body();
//! let p = document.create_element("p", false);
//! document.append_child(&body, &p);
//! document.append_child(&p, &document.create_text_node("1 < 2"));
//! assert_eq!(body.inner_html(), "<p>1 &lt; 2</p>");
//! ```

use crate::{
	document::{Document, NodeState, NodeType},
	Attrs, NodeRef, Result, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter, Write as _},
};
use std::rc::{Rc, Weak};
use tracing::{instrument, trace, warn};

/// Elements that serialize without closing tag.
const VOID_TAGS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr"];

#[derive(Debug)]
enum Kind {
	Element { tag: String, svg: bool },
	Text,
	Comment,
}

struct NodeData {
	kind: Kind,
	text: RefCell<String>,
	attributes: RefCell<Vec<(String, String)>>,
	parent: RefCell<Weak<NodeData>>,
	children: RefCell<Vec<Node>>,
	listening: RefCell<Vec<String>>,
	state: Rc<NodeState<Node>>,
}

/// A shared handle to an in-memory node. Equality is identity.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for Node {}

impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			Kind::Element { tag, .. } => write!(f, "Node(<{}> with {} child node(s))", tag, self.0.children.borrow().len()),
			Kind::Text if cfg!(feature = "dangerous-logging") => write!(f, "Node(text {:?})", self.0.text.borrow()),
			Kind::Text => write!(f, "Node(text of length {})", self.0.text.borrow().len()),
			Kind::Comment => f.write_str("Node(comment)"),
		}
	}
}

impl Node {
	fn new(kind: Kind, text: &str) -> Self {
		Self(Rc::new(NodeData {
			kind,
			text: RefCell::new(text.to_owned()),
			attributes: RefCell::default(),
			parent: RefCell::default(),
			children: RefCell::default(),
			listening: RefCell::default(),
			state: Rc::new(NodeState::new()),
		}))
	}

	#[must_use]
	pub fn node_type(&self) -> NodeType {
		match self.0.kind {
			Kind::Element { .. } => NodeType::Element,
			Kind::Text => NodeType::Text,
			Kind::Comment => NodeType::Comment,
		}
	}

	/// Upper-cased for HTML elements, verbatim for SVG ones and empty otherwise.
	#[must_use]
	pub fn tag_name(&self) -> String {
		match &self.0.kind {
			Kind::Element { tag, svg: false } => tag.to_uppercase(),
			Kind::Element { tag, svg: true } => tag.clone(),
			Kind::Text | Kind::Comment => String::new(),
		}
	}

	#[must_use]
	pub fn is_svg(&self) -> bool {
		matches!(self.0.kind, Kind::Element { svg: true, .. })
	}

	#[must_use]
	pub fn text(&self) -> String {
		self.0.text.borrow().clone()
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.0.attributes.borrow().iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	#[must_use]
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.0.attributes.borrow().clone()
	}

	#[must_use]
	pub fn child_nodes(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	#[must_use]
	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	#[must_use]
	pub fn is_listening(&self, event: &str) -> bool {
		self.0.listening.borrow().iter().any(|e| e == event)
	}

	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	#[must_use]
	pub fn inner_html(&self) -> String {
		let mut html = String::new();
		for child in self.0.children.borrow().iter() {
			child.write_html(&mut html);
		}
		html
	}

	fn write_html(&self, html: &mut String) {
		match &self.0.kind {
			Kind::Text => escape_into(html, &self.0.text.borrow(), false),
			Kind::Comment => {
				let _ = write!(html, "<!--{}-->", self.0.text.borrow());
			}
			Kind::Element { tag, .. } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in self.0.attributes.borrow().iter() {
					let _ = write!(html, " {}=\"", name);
					escape_into(html, value, true);
					html.push('"');
				}
				html.push('>');
				if VOID_TAGS.contains(&tag.as_str()) {
					return;
				}
				html.push_str(&self.inner_html());
				let _ = write!(html, "</{}>", tag);
			}
		}
	}

	fn set_attribute(&self, name: &str, value: &str) {
		let mut attributes = self.0.attributes.borrow_mut();
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, slot)) => value.clone_into(slot),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
	}

	fn remove_attribute(&self, name: &str) {
		self.0.attributes.borrow_mut().retain(|(n, _)| n != name);
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			parent.0.children.borrow_mut().retain(|child| child != self);
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}
}

fn escape_into(html: &mut String, text: &str, attribute: bool) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' if attribute => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}

/// Owns the `<body>` element new trees are usually mounted into, and counts attribute writes.
#[derive(Clone, Debug)]
pub struct MemoryDocument {
	body: Node,
	attribute_writes: Rc<Cell<usize>>,
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	#[must_use]
	pub fn new() -> Self {
		Self {
			body: Node::new(Kind::Element { tag: "body".to_owned(), svg: false }, ""),
			attribute_writes: Rc::default(),
		}
	}

	#[must_use]
	pub fn body(&self) -> Node {
		self.body.clone()
	}

	/// How many times an attribute was set or removed through this document so far.
	#[must_use]
	pub fn attribute_writes(&self) -> usize {
		self.attribute_writes.get()
	}

	/// Delivers `event` to `node`'s handler, if it is listening for it.
	///
	/// The handler receives a mapping with `type`, `target` (a [`NodeRef`] to `node`) and the entries of `detail`.
	/// Returns the handler's result, or [`None`] if nothing handled the event.
	///
	/// # Errors
	///
	/// Errors raised by the handler.
	#[instrument(skip(detail))]
	pub fn dispatch(&self, node: &Node, event: &str, detail: Attrs) -> Result<Option<Value>> {
		if !node.is_listening(event) {
			trace!("Not listening.");
			return Ok(None);
		}
		let handler = match node.0.state.event(event) {
			Some(handler) => handler,
			None => {
				warn!("Listening for {:?} without handler.", event);
				return Ok(None);
			}
		};

		let target = NodeRef::new();
		target.set(node.clone());
		let mut payload = Attrs::new();
		payload.insert("type", event);
		payload.insert("target", target);
		payload.merge(detail);
		handler.call(&[Value::Map(payload)]).map(Some)
	}

	fn count_write(&self) {
		self.attribute_writes.set(self.attribute_writes.get() + 1);
	}
}

impl Document for MemoryDocument {
	type Node = Node;

	fn create_element(&self, tag: &str, svg: bool) -> Node {
		Node::new(Kind::Element { tag: tag.to_owned(), svg }, "")
	}

	fn create_text_node(&self, text: &str) -> Node {
		Node::new(Kind::Text, text)
	}

	fn create_comment(&self, data: &str) -> Node {
		Node::new(Kind::Comment, data)
	}

	fn node_type(&self, node: &Node) -> NodeType {
		node.node_type()
	}

	fn tag_name(&self, node: &Node) -> String {
		node.tag_name()
	}

	fn text(&self, node: &Node) -> String {
		node.text()
	}

	fn set_text(&self, node: &Node, text: &str) {
		*node.0.text.borrow_mut() = text.to_owned();
	}

	fn attributes(&self, node: &Node) -> Vec<(String, String)> {
		node.attributes()
	}

	fn get_attribute(&self, node: &Node, name: &str) -> Option<String> {
		node.attribute(name)
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) {
		self.count_write();
		node.set_attribute(name, value);
	}

	fn remove_attribute(&self, node: &Node, name: &str) {
		self.count_write();
		node.remove_attribute(name);
	}

	/// Namespaced attributes are stored under their local name.
	fn set_attribute_ns(&self, node: &Node, _namespace: &str, name: &str, value: &str) {
		self.count_write();
		node.set_attribute(name.rsplit(':').next().unwrap_or(name), value);
	}

	fn remove_attribute_ns(&self, node: &Node, _namespace: &str, local_name: &str) {
		self.count_write();
		node.remove_attribute(local_name);
	}

	fn child_nodes(&self, node: &Node) -> Vec<Node> {
		node.child_nodes()
	}

	fn child_node(&self, node: &Node, index: usize) -> Option<Node> {
		node.0.children.borrow().get(index).cloned()
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		let parent = node.parent()?;
		let children = parent.0.children.borrow();
		let index = children.iter().position(|child| child == node)?;
		children.get(index + 1).cloned()
	}

	fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) {
		if reference == Some(child) {
			return;
		}
		child.detach();
		let mut children = parent.0.children.borrow_mut();
		let index = match reference {
			Some(reference) => match children.iter().position(|c| c == reference) {
				Some(index) => index,
				None => {
					warn!("Reference node is not a child of the given parent. Appending instead.");
					children.len()
				}
			},
			None => children.len(),
		};
		children.insert(index, child.clone());
		*child.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
	}

	fn remove_child(&self, parent: &Node, child: &Node) {
		if child.parent().as_ref() == Some(parent) {
			child.detach();
		} else {
			warn!("Tried to remove a node from a parent it isn't attached to. Ignoring.");
		}
	}

	fn listen(&self, node: &Node, event: &str) {
		if !node.is_listening(event) {
			node.0.listening.borrow_mut().push(event.to_owned());
		}
	}

	fn unlisten(&self, node: &Node, event: &str) {
		node.0.listening.borrow_mut().retain(|e| e != event);
	}

	fn state(&self, node: &Node) -> Rc<NodeState<Node>> {
		Rc::clone(&node.0.state)
	}

	fn release(&self, node: &Node) {
		node.0.listening.borrow_mut().clear();
	}
}
