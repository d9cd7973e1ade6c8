//! Reading live trees back into vnodes.
//!
//! The results are canonical in the sense of [`fix_props`](`crate::fix_props`): `[tag, attrs or null, ...children]`,
//! with attribute values as strings. Comments, empty text nodes and other node kinds are left out.

use crate::{
	document::{Document, NodeType},
	Attrs, Value,
};
use tracing::{instrument, trace};

/// Loads `node` by itself, or [`None`] if it would be left out as a child.
pub fn load<D: Document>(document: &D, node: &D::Node) -> Option<Value> {
	match document.node_type(node) {
		NodeType::Element => Some(load_element(document, node)),
		NodeType::Text => Some(document.text(node)).filter(|text| !text.is_empty()).map(Value::Str),
		NodeType::Comment | NodeType::Other => {
			trace!("Skipping {:?}.", node);
			None
		}
	}
}

#[instrument(skip(document))]
pub fn load_child_nodes<D: Document>(document: &D, parent: &D::Node) -> Vec<Value> {
	document.child_nodes(parent).iter().filter_map(|child| load(document, child)).collect()
}

pub fn load_element<D: Document>(document: &D, element: &D::Node) -> Value {
	let tag = document.tag_name(element);
	// HTML tag names come back upper-cased, SVG ones verbatim.
	let tag = if tag == tag.to_ascii_uppercase() { tag.to_ascii_lowercase() } else { tag };

	let mut vnode = vec![Value::Str(tag), load_attributes(document, element).map_or(Value::Null, Value::Map)];
	vnode.extend(load_child_nodes(document, element));
	Value::List(vnode)
}

/// [`None`] if `element` has no attributes.
pub fn load_attributes<D: Document>(document: &D, element: &D::Node) -> Option<Attrs> {
	let attributes = document.attributes(element);
	if attributes.is_empty() {
		None
	} else {
		Some(attributes.into_iter().collect())
	}
}
