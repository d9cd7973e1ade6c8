//! The browser backend, over `web-sys`.
//!
//! All event listeners added by one [`WebDocument`] share a single JavaScript closure, bound to the listening node's
//! bookkeeping ID. Node state lives in a table keyed by that ID, which is stored on the node as an expando property.
//!
//! Failing DOM operations are logged and skipped.

use crate::{
	document::{Document, NodeState, NodeType, SVG_NS},
	Attrs, NodeRef, Value,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use hashbrown::HashMap;
use js_sys::{Function, Object, Reflect};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{CharacterData, Element};

const EXPANDO: &str = "__sprig_dom_id";

/// A [`Document`] over the browser DOM.
///
/// Clones share their listener and state tables. Event listeners stop working once the last clone is dropped.
#[derive(Clone)]
pub struct WebDocument(Rc<Shared>);

struct Shared {
	document: web_sys::Document,
	states: RefCell<HashMap<u32, Rc<NodeState<web_sys::Node>>>>,
	listeners: RefCell<HashMap<(u32, String), Function>>,
	common_handler: Closure<dyn Fn(JsValue, web_sys::Event)>,
	next_id: Cell<u32>,
}

impl Debug for WebDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDocument")
			.field("states.len()", &self.0.states.borrow().len())
			.field("listeners.len()", &self.0.listeners.borrow().len())
			.finish_non_exhaustive()
	}
}

impl WebDocument {
	/// The current window's document, if there is one.
	#[must_use]
	pub fn new() -> Option<Self> {
		Some(Self::from_document(web_sys::window()?.document()?))
	}

	#[must_use]
	#[instrument]
	pub fn from_document(document: web_sys::Document) -> Self {
		Self(Rc::new_cyclic(|shared: &Weak<Shared>| {
			let shared = Weak::clone(shared);
			Shared {
				document,
				states: RefCell::default(),
				listeners: RefCell::default(),
				common_handler: Closure::wrap(Box::new(move |id: JsValue, event: web_sys::Event| {
					let span = trace_span!("common_handler", ?id, event = %event.type_());
					let _enter = span.enter();

					match shared.upgrade() {
						Some(shared) => WebDocument(shared).deliver(&id, event),
						None => error!("Event delivered after the document handle was dropped. Ignoring."),
					}
				}) as Box<dyn Fn(JsValue, web_sys::Event)>),
				next_id: Cell::new(0),
			}
		}))
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.0.document
	}

	#[must_use]
	pub fn body(&self) -> Option<web_sys::Node> {
		self.0.document.body().map(Into::into)
	}

	fn deliver(&self, id: &JsValue, event: web_sys::Event) {
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let state = match id.as_f64().and_then(|id| self.0.states.borrow().get(&(id as u32)).cloned()) {
			Some(state) => state,
			None => return error!("sprig-dom bug: Event delivered to a released node. Ignoring."),
		};

		let event_type = event.type_();
		let handler = match state.event(&event_type) {
			Some(handler) => handler,
			None => return trace!("No handler bound."),
		};

		let target = NodeRef::new();
		if let Some(node) = event.current_target().and_then(|target| target.dyn_into::<web_sys::Node>().ok()) {
			target.set(node);
		}
		let raw = NodeRef::new();
		raw.set(event);

		let mut payload = Attrs::new();
		payload.insert("type", event_type);
		payload.insert("target", target);
		payload.insert("event", raw);
		if let Err(error) = handler.call(&[Value::Map(payload)]) {
			error!("Event handler failed: {}", error);
		}
	}

	fn id(&self, node: &web_sys::Node) -> Option<u32> {
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		Reflect::get(node, &JsValue::from_str(EXPANDO)).ok()?.as_f64().map(|id| id as u32)
	}

	fn id_or_assign(&self, node: &web_sys::Node) -> u32 {
		if let Some(id) = self.id(node) {
			return id;
		}
		let id = self.0.next_id.get();
		self.0.next_id.set(id.wrapping_add(1));
		if let Err(error) = Reflect::set(node, &JsValue::from_str(EXPANDO), &JsValue::from(id)) {
			error!("Failed to tag node: {:?}", error);
		}
		id
	}
}

fn as_element(node: &web_sys::Node) -> Option<&Element> {
	let element = node.dyn_ref::<Element>();
	if element.is_none() {
		error!("Expected `web_sys::Element` but found {:?}. Ignoring.", node);
	}
	element
}

impl Document for WebDocument {
	type Node = web_sys::Node;

	fn create_element(&self, tag: &str, svg: bool) -> web_sys::Node {
		let created = if svg { self.0.document.create_element_ns(Some(SVG_NS), tag) } else { self.0.document.create_element(tag) };
		match created {
			Ok(element) => element.into(),
			Err(error) => {
				error!("Failed to create <{}>: {:?}. Substituting a comment.", tag, error);
				self.create_comment(tag)
			}
		}
	}

	fn create_text_node(&self, text: &str) -> web_sys::Node {
		self.0.document.create_text_node(text).into()
	}

	fn create_comment(&self, data: &str) -> web_sys::Node {
		self.0.document.create_comment(data).into()
	}

	fn node_type(&self, node: &web_sys::Node) -> NodeType {
		match node.node_type() {
			web_sys::Node::ELEMENT_NODE => NodeType::Element,
			web_sys::Node::TEXT_NODE => NodeType::Text,
			web_sys::Node::COMMENT_NODE => NodeType::Comment,
			_ => NodeType::Other,
		}
	}

	fn tag_name(&self, node: &web_sys::Node) -> String {
		node.dyn_ref::<Element>().map(Element::tag_name).unwrap_or_default()
	}

	fn text(&self, node: &web_sys::Node) -> String {
		node.dyn_ref::<CharacterData>().map(CharacterData::data).unwrap_or_default()
	}

	fn set_text(&self, node: &web_sys::Node, text: &str) {
		match node.dyn_ref::<CharacterData>() {
			Some(data) => data.set_data(text),
			None => error!("Expected `web_sys::CharacterData` but found {:?}. Ignoring.", node),
		}
	}

	fn attributes(&self, node: &web_sys::Node) -> Vec<(String, String)> {
		let attributes = match node.dyn_ref::<Element>() {
			Some(element) => element.attributes(),
			None => return Vec::new(),
		};
		(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| (attribute.local_name(), attribute.value())).collect()
	}

	fn get_attribute(&self, node: &web_sys::Node, name: &str) -> Option<String> {
		node.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&self, node: &web_sys::Node, name: &str, value: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn remove_attribute(&self, node: &web_sys::Node, name: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.remove_attribute(name) {
				error!("Failed to remove attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn set_attribute_ns(&self, node: &web_sys::Node, namespace: &str, name: &str, value: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.set_attribute_ns(Some(namespace), name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn remove_attribute_ns(&self, node: &web_sys::Node, namespace: &str, local_name: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.remove_attribute_ns(Some(namespace), local_name) {
				error!("Failed to remove attribute {:?}: {:?}", local_name, error);
			}
		}
	}

	fn child_nodes(&self, node: &web_sys::Node) -> Vec<web_sys::Node> {
		let child_nodes = node.child_nodes();
		(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect()
	}

	fn child_node(&self, node: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
		node.child_nodes().item(u32::try_from(index).ok()?)
	}

	fn parent_node(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn insert_before(&self, parent: &web_sys::Node, child: &web_sys::Node, reference: Option<&web_sys::Node>) {
		if let Err(error) = parent.insert_before(child, reference) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove_child(&self, parent: &web_sys::Node, child: &web_sys::Node) {
		if let Err(error) = parent.remove_child(child) {
			error!("Failed to remove the node: {:?}", error);
		}
	}

	fn replace_child(&self, parent: &web_sys::Node, new: &web_sys::Node, old: &web_sys::Node) {
		if let Err(error) = parent.replace_child(new, old) {
			error!("Failed to replace the node: {:?}", error);
		}
	}

	fn add_class(&self, node: &web_sys::Node, class: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.class_list().add_1(class) {
				error!("Failed to add class: {:?}", error);
			}
		}
	}

	fn remove_class(&self, node: &web_sys::Node, class: &str) {
		if let Some(element) = as_element(node) {
			if let Err(error) = element.class_list().remove_1(class) {
				error!("Failed to remove class: {:?}", error);
			}
		}
	}

	#[instrument(skip(self))]
	fn listen(&self, node: &web_sys::Node, event: &str) {
		let id = self.id_or_assign(node);
		let mut listeners = self.0.listeners.borrow_mut();
		if listeners.contains_key(&(id, event.to_owned())) {
			return trace!("Already listening.");
		}

		let listener = self.0.common_handler.as_ref().unchecked_ref::<Function>().bind1(&JsValue::UNDEFINED, &JsValue::from(id));
		if let Err(error) = node.add_event_listener_with_callback(event, &listener) {
			return error!("Failed to add event listener: {:?}", error);
		}
		listeners.insert((id, event.to_owned()), listener);
	}

	#[instrument(skip(self))]
	fn unlisten(&self, node: &web_sys::Node, event: &str) {
		let listener = match self.id(node).and_then(|id| self.0.listeners.borrow_mut().remove(&(id, event.to_owned()))) {
			Some(listener) => listener,
			None => return trace!("Not listening."),
		};
		if let Err(error) = node.remove_event_listener_with_callback(event, &listener) {
			error!("Failed to remove event listener: {:?}", error);
		}
	}

	fn state(&self, node: &web_sys::Node) -> Rc<NodeState<web_sys::Node>> {
		let id = self.id_or_assign(node);
		Rc::clone(self.0.states.borrow_mut().entry(id).or_default())
	}

	fn release(&self, node: &web_sys::Node) {
		let id = match self.id(node) {
			Some(id) => id,
			None => return,
		};

		let events = self.0.listeners.borrow().keys().filter(|(listening, _)| *listening == id).map(|(_, event)| event.clone()).collect::<Vec<_>>();
		for event in events {
			self.unlisten(node, &event);
		}
		self.0.states.borrow_mut().remove(&id);

		if let Err(error) = Reflect::delete_property(node.unchecked_ref::<Object>(), &JsValue::from_str(EXPANDO)) {
			error!("Failed to untag node: {:?}", error);
		}
	}
}

/// Runs tasks on the browser's microtask queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSpawner;

impl LocalSpawn for WebSpawner {
	fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		wasm_bindgen_futures::spawn_local(future);
		Ok(())
	}
}
