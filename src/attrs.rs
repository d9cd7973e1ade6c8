//! The attribute engine.

use crate::{
	document::{Decorate, Document, Lifecycle, XLINK_NS},
	value::is_diff,
	Attrs, Value,
};
use tracing::{instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Writes `attrs` onto `element`.
///
/// - `key` is never written.
/// - `ref` takes a [`NodeRef`](`crate::NodeRef`) that receives `element` once it is created.
/// - Lists, mappings and functions are resolved through `decorator`, and removed if it has no literal value for them.
/// - `true` writes the attribute's own name, empty values remove the attribute.
/// - `xlink:`-prefixed names use the XLink namespace inside SVG.
#[instrument(skip(document, attrs, decorator))]
pub fn assign_props<D: Document>(document: &D, element: &D::Node, attrs: &Attrs, svg: bool, decorator: Option<&dyn Decorate<D>>) {
	for (key, value) in attrs.iter() {
		let span = trace_span!("Assigning attribute", key);
		let _enter = span.enter();

		match (key, value) {
			("key", _) => trace!("Skipping reconciliation key."),
			("ref", Value::Ref(node_ref)) => {
				let node_ref = node_ref.clone();
				document.state(element).on(Lifecycle::Create, move |node| {
					node_ref.set(node.clone());
					None
				});
			}
			("ref", _) => {
				if STATIC_MAX_LEVEL >= Level::WARN {
					warn!("Expected `ref` to be a `NodeRef` but found {}. Ignoring.", kind_of(value));
				}
			}
			(key, Value::List(_) | Value::Map(_) | Value::Func(_) | Value::Ref(_)) => {
				let resolved = decorator.and_then(|decorator| decorator.attribute(document, element, key, value)).unwrap_or_default();
				write_attribute(document, element, key, &resolved, svg);
			}
			(key, value) => write_attribute(document, element, key, value, svg),
		}
	}
}

/// Assigns only the attributes that differ structurally between `prev` and `next`.
/// Keys missing from `next` are removed.
/// A changed `ref` receives `element` right away, since there is no creation to wait for.
///
/// Returns whether anything was assigned.
#[instrument(skip(document, prev, next, decorator))]
pub fn update_props<D: Document>(document: &D, element: &D::Node, prev: Option<&Attrs>, next: Option<&Attrs>, svg: bool, decorator: Option<&dyn Decorate<D>>) -> bool {
	let none = Attrs::new();
	let prev = prev.unwrap_or(&none);
	let next = next.unwrap_or(&none);

	let mut changed = Attrs::new();
	for key in prev.keys() {
		if !next.contains_key(key) {
			changed.insert(key, Value::Null);
		}
	}
	for (key, value) in next.iter() {
		match prev.get(key) {
			Some(old) if !is_diff(old, value) => (),
			_ => {
				changed.insert(key, value.clone());
			}
		}
	}

	match changed.remove("ref") {
		Some(Value::Ref(node_ref)) => {
			trace!("Rebinding node reference.");
			node_ref.set(element.clone());
		}
		Some(other) => {
			changed.insert("ref", other);
		}
		None => (),
	}

	if changed.is_empty() {
		return false;
	}
	trace!("{} changed attribute(s).", changed.len());
	assign_props(document, element, &changed, svg, decorator);
	true
}

fn write_attribute<D: Document>(document: &D, element: &D::Node, key: &str, value: &Value, svg: bool) {
	let literal = match value {
		value if value.is_empty() => None,
		Value::Bool(true) => Some(key.to_owned()),
		Value::List(_) | Value::Map(_) => Some(value.to_string()),
		Value::Func(_) | Value::Ref(_) => {
			warn!("No literal value for attribute {:?} of kind {}. Removing it.", key, kind_of(value));
			None
		}
		value => value.to_text(),
	};

	match (svg, key.strip_prefix("xlink:"), literal) {
		(true, Some(_), Some(literal)) => document.set_attribute_ns(element, XLINK_NS, key, &literal),
		(true, Some(local_name), None) => document.remove_attribute_ns(element, XLINK_NS, local_name),
		(_, _, Some(literal)) => document.set_attribute(element, key, &literal),
		(_, _, None) => document.remove_attribute(element, key),
	}
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::Str(_) => "a string",
		Value::List(_) => "a list",
		Value::Map(_) => "a mapping",
		Value::Func(_) => "a function",
		Value::Ref(_) => "a ref",
	}
}
