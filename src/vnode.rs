//! Vnode normalization.
//!
//! [`fix_props`] resolves a single vnode's shorthand and component tag, [`Vnode::normalize`] turns a whole
//! [`Value`] tree into the closed [`Vnode`] shape that the materializer and reconciler switch on.

use crate::{Attrs, Error, Result, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{instrument, trace};

/// `tag#id.class.class`, where every part is optional.
static SELECTOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\w-]*)(#[\w-]+)?((?:\.[\w-]+)*)$").unwrap());

/// Tag used for selectors without an explicit tag name, like `#main` or `.row`.
pub const DEFAULT_TAG: &str = "div";

/// Whether `value` has the shape of a single vnode rather than a list of children.
///
/// That's the case for lists starting with a function, or with a selector string followed by
/// `null`, an attribute mapping or a child list.
#[must_use]
pub fn is_vnode(value: &Value) -> bool {
	match value {
		Value::List(items) => match items.as_slice() {
			[Value::Func(_), ..] => true,
			[Value::Str(tag), second, ..] => matches!(second, Value::Null | Value::Map(_) | Value::List(_)) && SELECTOR.is_match(tag),
			_ => false,
		},
		_ => false,
	}
}

/// Canonicalizes one vnode into `[tag, attrs|null, ...children]`.
///
/// Component tags are invoked with `(attrs, children)` and their result is fixed in turn.
/// Children are flattened so that only vnodes and scalars remain among them.
/// Values that aren't vnode-shaped are returned unchanged.
///
/// # Errors
///
/// Errors raised by component functions.
#[instrument(skip(vnode))]
pub fn fix_props(vnode: &Value) -> Result<Value> {
	let items = match vnode {
		Value::List(items) if is_vnode(vnode) => items,
		_ => return Ok(vnode.clone()),
	};

	let (attrs, children) = split_attrs(items);
	let mut flat = Vec::with_capacity(children.len());
	flatten_into(children, &mut flat);

	match &items[0] {
		Value::Func(component) => {
			trace!("Expanding component.");
			let rendered = component.call(&[attrs.map_or(Value::Null, Value::Map), Value::List(flat)])?;
			fix_props(&rendered)
		}
		Value::Str(selector) => {
			let (tag, attrs) = expand_selector(selector, attrs);
			let mut fixed = Vec::with_capacity(flat.len() + 2);
			fixed.push(Value::Str(tag));
			fixed.push(attrs.map_or(Value::Null, Value::Map));
			fixed.extend(flat);
			Ok(Value::List(fixed))
		}
		_ => Ok(vnode.clone()),
	}
}

/// Normalizes a whole tree and writes it back as plain [`Value`]s.
///
/// # Errors
///
/// [`Error::InvalidVnode`] for values that can't describe a tree, and errors raised by component functions.
pub fn fix_tree(vnode: &Value) -> Result<Value> {
	Vnode::normalize(vnode).map(|vnode| vnode.into_value())
}

/// Normalized vnode.
///
/// Components are fully expanded and nested lists are spliced, so [`Vnode::Fragment`] only ever appears
/// at the root and never inside an element's children or another fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Vnode {
	/// A child slot holding an empty value. It doesn't materialize.
	Empty,
	Text(String),
	Element(Element),
	Fragment(Vec<Vnode>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
	pub tag: String,
	pub attrs: Option<Attrs>,
	pub children: Vec<Vnode>,
}

impl Vnode {
	/// # Errors
	///
	/// [`Error::InvalidVnode`] if `value` is `null`, a mapping or a ref, or a component renders one of those at the root.
	/// Errors raised by component functions are passed through.
	#[instrument(skip(value))]
	pub fn normalize(value: &Value) -> Result<Self> {
		match value {
			Value::Null => Err(Error::InvalidVnode(value.to_string())),
			Value::Bool(false) => Ok(Vnode::Text(String::new())),
			Value::Str(text) if text.is_empty() => Ok(Vnode::Text(String::new())),
			value => match Self::single(value)? {
				Vnode::Empty => Err(Error::InvalidVnode(value.to_string())),
				vnode => Ok(vnode),
			},
		}
	}

	fn single(value: &Value) -> Result<Self> {
		match value {
			Value::Func(component) => Self::single(&component.call(&[Value::Null, Value::List(Vec::new())])?),
			Value::List(_) if is_vnode(value) => Self::element(&fix_props(value)?),
			Value::List(items) => {
				let mut flat = Vec::with_capacity(items.len());
				for item in items {
					Self::collect(item, &mut flat)?;
				}
				Ok(Vnode::Fragment(flat))
			}
			Value::Map(_) | Value::Ref(_) => Err(Error::InvalidVnode(value.to_string())),
			value if value.is_empty() => Ok(Vnode::Empty),
			value => Ok(Vnode::Text(value.to_text().unwrap_or_default())),
		}
	}

	/// `fixed` is the output of [`fix_props`], which may have rendered into something other than an element.
	fn element(fixed: &Value) -> Result<Self> {
		let items = match fixed {
			Value::List(items) if is_vnode(fixed) => items,
			_ => return Self::single(fixed),
		};
		let tag = match items.first() {
			Some(Value::Str(tag)) => tag.clone(),
			_ => return Err(Error::InvalidVnode(fixed.to_string())),
		};
		let attrs = items.get(1).and_then(Value::as_map).cloned();
		let mut children = Vec::new();
		for child in items.get(2..).unwrap_or_default() {
			Self::collect(child, &mut children)?;
		}
		Ok(Vnode::Element(Element { tag, attrs, children }))
	}

	/// Pushes the slots `value` occupies in a flattened child list.
	fn collect(value: &Value, out: &mut Vec<Vnode>) -> Result<()> {
		match value {
			Value::List(items) if !is_vnode(value) => {
				for item in items {
					Self::collect(item, out)?;
				}
			}
			value => match Self::single(value)? {
				Vnode::Fragment(items) => out.extend(items),
				vnode => out.push(vnode),
			},
		}
		Ok(())
	}

	#[must_use]
	pub fn into_value(self) -> Value {
		match self {
			Vnode::Empty => Value::Null,
			Vnode::Text(text) => Value::Str(text),
			Vnode::Element(Element { tag, attrs, children }) => {
				let mut items = Vec::with_capacity(children.len() + 2);
				items.push(Value::Str(tag));
				items.push(attrs.map_or(Value::Null, Value::Map));
				items.extend(children.into_iter().map(Vnode::into_value));
				Value::List(items)
			}
			Vnode::Fragment(items) => Value::List(items.into_iter().map(Vnode::into_value).collect()),
		}
	}

	/// Children of a fragment, or the vnode itself as only item otherwise.
	#[must_use]
	pub fn as_slots(&self) -> &[Vnode] {
		match self {
			Vnode::Fragment(items) => items,
			vnode => core::slice::from_ref(vnode),
		}
	}
}

fn split_attrs(items: &[Value]) -> (Option<Attrs>, &[Value]) {
	match items.get(1) {
		Some(Value::Map(attrs)) => (Some(attrs.clone()), items.get(2..).unwrap_or_default()),
		Some(Value::Null) => (None, items.get(2..).unwrap_or_default()),
		Some(_) => (None, &items[1..]),
		None => (None, &[]),
	}
}

fn flatten_into(values: &[Value], out: &mut Vec<Value>) {
	for value in values {
		match value {
			Value::List(items) if !is_vnode(value) => flatten_into(items, out),
			value => out.push(value.clone()),
		}
	}
}

fn expand_selector(selector: &str, attrs: Option<Attrs>) -> (String, Option<Attrs>) {
	let captures = match SELECTOR.captures(selector) {
		Some(captures) => captures,
		None => return (selector.to_owned(), attrs),
	};

	let tag = captures.get(1).map_or("", |tag| tag.as_str());
	let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
	let id = captures.get(2).map(|id| id.as_str().trim_start_matches('#'));
	let classes = captures.get(3).map_or_else(Vec::new, |classes| classes.as_str().split('.').filter(|class| !class.is_empty()).collect::<Vec<_>>());

	if id.is_none() && classes.is_empty() {
		return (tag.to_owned(), attrs);
	}

	let mut attrs = attrs.unwrap_or_default();
	if let Some(id) = id {
		attrs.insert("id", id);
	}
	if !classes.is_empty() {
		let merged = merge_classes(&classes, attrs.get("class"));
		attrs.insert("class", merged);
	}
	(tag.to_owned(), Some(attrs))
}

/// Selector classes go first, duplicates are dropped and first-seen order is kept.
fn merge_classes(selector_classes: &[&str], declared: Option<&Value>) -> Value {
	if let Some(Value::Map(presence)) = declared {
		let mut merged = Attrs::new();
		for class in selector_classes {
			merged.insert(*class, 1);
		}
		for (class, value) in presence.iter() {
			if !merged.contains_key(class) {
				merged.insert(class, value.clone());
			}
		}
		return Value::Map(merged);
	}

	let mut merged: Vec<Value> = Vec::new();
	let mut push = |class: Value| {
		if !merged.contains(&class) {
			merged.push(class);
		}
	};
	for class in selector_classes {
		push(Value::from(*class));
	}
	match declared {
		Some(Value::Str(classes)) => classes.split_whitespace().for_each(|class| push(class.into())),
		Some(Value::List(classes)) => classes.iter().cloned().for_each(&mut push),
		_ => (),
	}
	Value::List(merged)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{attrs, list};

	#[test]
	fn selector_recognition() {
		assert!(is_vnode(&list!["div", ()]));
		assert!(is_vnode(&list!["#a.b", attrs! {}]));
		assert!(is_vnode(&list!["span", list!["foo"]]));
		assert!(!is_vnode(&list!["hola", "mundo"]));
		assert!(!is_vnode(&list!["just: ", ()]));
		assert!(!is_vnode(&list!["div"]));
	}

	#[test]
	fn merge_into_whitespace_string() {
		assert_eq!(merge_classes(&["a", "b"], Some(&"b  c".into())), list!["a", "b", "c"]);
	}
}
