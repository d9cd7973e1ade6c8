use crate::document::Document;
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{instrument, trace};

/// An ordered group of live nodes without a wrapping container.
///
/// The nodes are inserted into the real parent individually. The fragment is located through its
/// [anchor](`Fragment::anchor`), which is its first node. An empty fragment holds an empty text node as placeholder,
/// so it can still be inserted and found.
///
/// Clones share the same group. Equality is identity.
#[derive(Debug)]
pub struct Fragment<N>(Rc<RefCell<Nodes<N>>>);

#[derive(Debug)]
struct Nodes<N> {
	content: Vec<N>,
	placeholder: Option<N>,
}

impl<N> Clone for Fragment<N> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<N> PartialEq for Fragment<N> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<N: Clone + PartialEq> Fragment<N> {
	pub fn new<D: Document<Node = N>>(document: &D, content: Vec<N>) -> Self {
		let placeholder = if content.is_empty() { Some(document.create_text_node("")) } else { None };
		Self(Rc::new(RefCell::new(Nodes { content, placeholder })))
	}

	/// The first node, or the placeholder.
	#[must_use]
	pub fn anchor(&self) -> N {
		let nodes = self.0.borrow();
		match (&nodes.placeholder, nodes.content.first()) {
			(Some(placeholder), _) => placeholder.clone(),
			(None, Some(first)) => first.clone(),
			(None, None) => unreachable!("sprig-dom bug: Empty fragment without placeholder."),
		}
	}

	/// Every node currently owned, including the placeholder.
	#[must_use]
	pub fn nodes(&self) -> Vec<N> {
		let nodes = self.0.borrow();
		match &nodes.placeholder {
			Some(placeholder) => vec![placeholder.clone()],
			None => nodes.content.clone(),
		}
	}

	/// Owned nodes that aren't the placeholder.
	#[must_use]
	pub fn content(&self) -> Vec<N> {
		self.0.borrow().content.clone()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.borrow().content.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.borrow().content.is_empty()
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<N> {
		self.0.borrow().content.get(index).cloned()
	}

	/// The parent the anchor is attached to, if the fragment is mounted.
	pub fn parent<D: Document<Node = N>>(&self, document: &D) -> Option<N> {
		document.parent_node(&self.anchor())
	}

	/// Inserts `node` so it becomes the `index`th content node.
	#[instrument(skip(self, document, node))]
	pub(crate) fn insert<D: Document<Node = N>>(&self, document: &D, index: usize, node: N) {
		let parent = self.parent(document);
		let mut nodes = self.0.borrow_mut();

		if let Some(placeholder) = nodes.placeholder.take() {
			trace!("Replacing placeholder.");
			if let Some(parent) = &parent {
				document.replace_child(parent, &node, &placeholder);
			}
			document.release(&placeholder);
			nodes.content.push(node);
			return;
		}

		let index = index.min(nodes.content.len());
		if let Some(parent) = &parent {
			let reference = match nodes.content.get(index) {
				Some(reference) => Some(reference.clone()),
				None => nodes.content.last().and_then(|last| document.next_sibling(last)),
			};
			document.insert_before(parent, &node, reference.as_ref());
		}
		nodes.content.insert(index, node);
	}

	/// Swaps the `index`th content node for `node` and returns the old one, detached.
	pub(crate) fn replace<D: Document<Node = N>>(&self, document: &D, index: usize, node: N) -> Option<N> {
		let parent = self.parent(document);
		let mut nodes = self.0.borrow_mut();
		let slot = nodes.content.get_mut(index)?;
		if let Some(parent) = &parent {
			document.replace_child(parent, &node, slot);
		}
		Some(core::mem::replace(slot, node))
	}

	/// Gives up ownership of the `index`th content node without detaching it.
	///
	/// If that was the last one, a placeholder is inserted in front of it.
	#[instrument(skip(self, document))]
	pub(crate) fn take<D: Document<Node = N>>(&self, document: &D, index: usize) -> Option<N> {
		let parent = self.parent(document);
		let mut nodes = self.0.borrow_mut();
		if index >= nodes.content.len() {
			return None;
		}
		let taken = nodes.content.remove(index);
		if nodes.content.is_empty() {
			trace!("Fragment emptied. Inserting placeholder.");
			let placeholder = document.create_text_node("");
			if let Some(parent) = &parent {
				document.insert_before(parent, &placeholder, Some(&taken));
			}
			nodes.placeholder = Some(placeholder);
		}
		Some(taken)
	}
}

/// The live root produced by materializing a vnode.
#[derive(Debug, Clone, PartialEq)]
pub enum Mounted<N> {
	Node(N),
	Fragment(Fragment<N>),
}

impl<N: Clone + PartialEq> Mounted<N> {
	/// The node marking where this root starts.
	#[must_use]
	pub fn anchor(&self) -> N {
		match self {
			Mounted::Node(node) => node.clone(),
			Mounted::Fragment(fragment) => fragment.anchor(),
		}
	}

	/// The nodes to insert when mounting this root, in order.
	#[must_use]
	pub fn nodes(&self) -> Vec<N> {
		match self {
			Mounted::Node(node) => vec![node.clone()],
			Mounted::Fragment(fragment) => fragment.nodes(),
		}
	}

	#[must_use]
	pub fn as_node(&self) -> Option<&N> {
		match self {
			Mounted::Node(node) => Some(node),
			Mounted::Fragment(_) => None,
		}
	}

	#[must_use]
	pub fn as_fragment(&self) -> Option<&Fragment<N>> {
		match self {
			Mounted::Node(_) => None,
			Mounted::Fragment(fragment) => Some(fragment),
		}
	}
}
