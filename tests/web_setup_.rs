#![cfg(target_arch = "wasm32")]
#![allow(dead_code)]

use js_sys::Promise;
use sprig_dom::{
	decorate,
	web::{WebDocument, WebSpawner},
	Document as _, DomDiffer,
};
use std::sync::Once;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, Element};

static LOG_INITIALIZED: Once = Once::new();

/// A fresh container appended to `<body>`, and a decorated differ.
pub fn setup() -> (WebDocument, web_sys::Node, DomDiffer<WebDocument>) {
	//TODO: Fail on Warning or Error.
	LOG_INITIALIZED.call_once(tracing_wasm::set_as_global_default);

	let document = WebDocument::new().unwrap();
	let container = document.create_element("div", false);
	document.append_child(&document.body().unwrap(), &container);
	let differ = DomDiffer::new(document.clone(), WebSpawner).with_decorator(decorate::defaults());
	(document, container, differ)
}

pub fn inner_html(node: &web_sys::Node) -> String {
	node.dyn_ref::<Element>().unwrap().inner_html()
}

/// Resolves once the microtask queue has drained, which includes pending teardowns.
pub async fn settle() {
	let promise = Promise::new(&mut |resolve, _reject| {
		window().unwrap().set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0).unwrap();
	});
	JsFuture::from(promise).await.unwrap();
}
