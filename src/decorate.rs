//! Ready-made [`Decorate`] implementations.
//!
//! [`defaults`] chains [`Attributes`] and [`Listeners`], which covers style and class mappings, datasets,
//! event handlers and lifecycle callbacks given as attributes.

use crate::{
	document::{Created, Decorate, Document, Lifecycle},
	vnode::Vnode,
	Attrs, Func, NodeRef, Result, Value,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// Everything [`Attributes`] and [`Listeners`] can do, in one decorator.
#[must_use]
pub fn defaults<D: Document>() -> Chain<D> {
	Chain::new().with(Attributes::new()).with(Listeners::new())
}

/// Resolves an attribute by name.
pub type Helper<D> = Rc<dyn Fn(&D, &<D as Document>::Node, &Value) -> Option<Value>>;

/// Turns structured attribute values into literal ones:
///
/// - `style` mappings become CSS declarations, with camel-cased property names dash-cased.
/// - `class` mappings keep their keys with truthy values, class lists are joined.
/// - Other mappings are spread into `data-*` attributes, `data` itself without infix.
/// - Helpers registered by attribute name take precedence over all of the above.
pub struct Attributes<D: Document> {
	helpers: HashMap<String, Helper<D>>,
}

impl<D: Document> Default for Attributes<D> {
	fn default() -> Self {
		Self { helpers: HashMap::new() }
	}
}

impl<D: Document> Attributes<D> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_helper(mut self, name: &str, helper: impl Fn(&D, &D::Node, &Value) -> Option<Value> + 'static) -> Self {
		self.helpers.insert(name.to_owned(), Rc::new(helper));
		self
	}
}

impl<D: Document> Decorate<D> for Attributes<D> {
	fn attribute(&self, document: &D, element: &D::Node, key: &str, value: &Value) -> Option<Value> {
		if let Some(helper) = self.helpers.get(key) {
			return helper(document, element, value);
		}

		match (key, value) {
			("style", Value::Map(styles)) => Some(style_text(styles).into()),
			("class", Value::Map(_) | Value::List(_)) => Some(class_text(value).into()),
			(_, Value::Map(data)) => {
				spread_dataset(document, element, key, data);
				None
			}
			_ => None,
		}
	}
}

fn dash_case(name: &str) -> String {
	let mut dashed = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			dashed.push('-');
			dashed.push(c.to_ascii_lowercase());
		} else {
			dashed.push(c);
		}
	}
	dashed
}

fn style_text(styles: &Attrs) -> String {
	styles
		.iter()
		.filter(|(_, value)| !value.is_empty())
		.filter_map(|(property, value)| Some(format!("{}: {}", dash_case(property), value.to_text()?)))
		.collect::<Vec<_>>()
		.join("; ")
}

fn class_text(classes: &Value) -> String {
	match classes {
		Value::Map(presence) => presence.iter().filter(|(_, on)| on.is_truthy()).map(|(class, _)| class).collect::<Vec<_>>().join(" "),
		Value::List(items) => items.iter().filter(|item| !item.is_empty()).filter_map(|item| item.to_text().or_else(|| Some(class_text(item)))).collect::<Vec<_>>().join(" "),
		value => value.to_text().unwrap_or_default(),
	}
}

#[instrument(skip(document, data))]
fn spread_dataset<D: Document>(document: &D, element: &D::Node, key: &str, data: &Attrs) {
	for (name, value) in data.iter() {
		let attribute = if key == "data" { format!("data-{}", dash_case(name)) } else { format!("data-{}-{}", dash_case(key), dash_case(name)) };
		match value.to_text() {
			_ if value.is_empty() => document.remove_attribute(element, &attribute),
			Some(text) => document.set_attribute(element, &attribute, &text),
			None => document.set_attribute(element, &attribute, &value.to_string()),
		}
	}
}

/// Binds function-valued attributes:
///
/// - `on<event>` handlers are registered in the element's event table and the backend starts listening.
///   They're called with the event mapping as only argument.
/// - `oncreate`, `onupdate` and `ondestroy` become lifecycle callbacks, called with a [`NodeRef`] to the element.
///   Each holds one slot per element, so updates swap the function instead of adding hooks.
/// - A teardown hook drops all handlers. The backend stops listening once the element is released.
///
/// An optional interceptor sees every event first and vetoes it by returning `false`.
#[derive(Debug, Default, Clone)]
pub struct Listeners {
	interceptor: Option<Func>,
}

impl Listeners {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_interceptor(mut self, interceptor: Func) -> Self {
		self.interceptor = Some(interceptor);
		self
	}
}

impl<D: Document> Decorate<D> for Listeners {
	fn attribute(&self, document: &D, element: &D::Node, key: &str, value: &Value) -> Option<Value> {
		let handler = value.as_func()?.clone();
		let state = document.state(element);

		let lifecycle = match key {
			"oncreate" => Some(Lifecycle::Create),
			"onupdate" => Some(Lifecycle::Update),
			"ondestroy" => Some(Lifecycle::Destroy),
			_ => None,
		};
		if let Some(lifecycle) = lifecycle {
			if state.set_callback(lifecycle, Some(handler)).is_some() {
				trace!("Swapped {:?} callback.", lifecycle);
				return None;
			}
			let weak = Rc::downgrade(&state);
			state.on(lifecycle, move |node| {
				let callback = match weak.upgrade().and_then(|state| state.callback(lifecycle)) {
					Some(callback) => callback,
					None => return None,
				};
				let node_ref = NodeRef::new();
				node_ref.set(node.clone());
				if let Err(error) = callback.call(&[Value::Ref(node_ref)]) {
					error!("{:?} callback failed: {}", lifecycle, error);
				}
				None
			});
			return None;
		}

		let event = match key.strip_prefix("on") {
			Some(event) if !event.is_empty() => event,
			_ => return None,
		};

		let interceptor = self.interceptor.clone();
		let bound = Func::new(move |args| {
			if let Some(interceptor) = &interceptor {
				if let Value::Bool(false) = interceptor.call(args)? {
					trace!("Event vetoed.");
					return Ok(Value::Null);
				}
			}
			handler.call(args)
		});

		let first_binding = state.events().is_empty();
		if state.set_event(event, Some(bound)).is_none() {
			document.listen(element, event);
		}
		if first_binding {
			let weak = Rc::downgrade(&state);
			state.on(Lifecycle::Teardown, move |_| {
				if let Some(state) = weak.upgrade() {
					for event in state.events() {
						state.set_event(&event, None);
					}
				}
				None
			});
		}
		None
	}
}

/// Runs several decorators in order.
///
/// Element hooks thread the node through, and the first one to render a replacement ends the chain.
/// For attributes, the last decorator with a literal value wins.
pub struct Chain<D: Document>(Vec<Rc<dyn Decorate<D>>>);

impl<D: Document> Default for Chain<D> {
	fn default() -> Self {
		Self(Vec::new())
	}
}

impl<D: Document> Chain<D> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, decorator: impl Decorate<D> + 'static) -> Self {
		self.0.push(Rc::new(decorator));
		self
	}
}

impl<D: Document> Decorate<D> for Chain<D> {
	fn element(&self, document: &D, mut element: D::Node, tag: &str, attrs: Option<&Attrs>, children: &[Vnode]) -> Result<Created<D::Node>> {
		for decorator in &self.0 {
			match decorator.element(document, element, tag, attrs, children)? {
				Created::Node(node) => element = node,
				rendered @ Created::Render(_) => return Ok(rendered),
			}
		}
		Ok(Created::Node(element))
	}

	fn attribute(&self, document: &D, element: &D::Node, key: &str, value: &Value) -> Option<Value> {
		self.0.iter().fold(None, |resolved, decorator| decorator.attribute(document, element, key, value).or(resolved))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{attrs, list};

	#[test]
	fn styles() {
		assert_eq!(style_text(&attrs! { "color" => "red", "fontSize" => "12px", "margin" => () }), "color: red; font-size: 12px");
	}

	#[test]
	fn classes() {
		assert_eq!(class_text(&attrs! { "a" => 1, "b" => 0, "c" => true }.into()), "a c");
		assert_eq!(class_text(&list!["a", (), list!["b", "c"]]), "a b c");
	}
}
