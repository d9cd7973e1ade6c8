#![cfg(target_arch = "wasm32")]

use sprig_dom::{attrs, list, Document as _, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::Element;

mod web_setup_;
use web_setup_::{inner_html, setup};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn text() {
	let (_document, container, differ) = setup();
	differ.mount(&container, &Value::from("Hello!")).unwrap();
	assert_eq!(inner_html(&container), "Hello!");
}

#[wasm_bindgen_test]
fn number() {
	let (_document, container, differ) = setup();
	differ.mount(&container, &Value::from(0)).unwrap();
	assert_eq!(inner_html(&container), "0");
}

#[wasm_bindgen_test]
fn div() {
	let (_document, container, differ) = setup();
	differ.mount(&container, &list!["div#main", attrs! { "title" => "t" }, "x"]).unwrap();
	assert_eq!(inner_html(&container), r#"<div title="t" id="main">x</div>"#);
}

#[wasm_bindgen_test]
fn structured_attributes() {
	let (_document, container, differ) = setup();
	differ
		.mount(
			&container,
			&list!["p", attrs! { "class" => attrs! { "on" => true, "off" => false }, "style" => attrs! { "fontWeight" => "bold" } }],
		)
		.unwrap();
	assert_eq!(inner_html(&container), r#"<p class="on" style="font-weight: bold"></p>"#);
}

#[wasm_bindgen_test]
fn svg() {
	let (document, container, differ) = setup();
	let root = differ
		.mount(&container, &list!["svg", (), list!["use", attrs! { "xlink:href" => "#shape" }]])
		.unwrap();
	let svg = root.as_node().unwrap();
	assert_eq!(svg.dyn_ref::<Element>().unwrap().namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));

	let r#use = document.child_nodes(svg)[0].clone();
	let r#use = r#use.dyn_ref::<Element>().unwrap();
	assert_eq!(r#use.namespace_uri().as_deref(), Some("http://www.w3.org/2000/svg"));
	assert_eq!(r#use.get_attribute_ns(Some("http://www.w3.org/1999/xlink"), "href").as_deref(), Some("#shape"));
}

#[wasm_bindgen_test]
fn fragment() {
	let (_document, container, differ) = setup();
	let root = differ.mount(&container, &list![list!["b", ()], "a", "c"]).unwrap();
	assert!(root.as_fragment().is_some());
	assert_eq!(inner_html(&container), "<b></b>ac");
}
