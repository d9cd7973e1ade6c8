use pretty_assertions::assert_eq;
use sprig_dom::{attrs, fix_props, fix_tree, list, Attrs, Error, Func, Result, Value, Vnode};

#[test]
fn selector_shorthand() {
	let fixed = fix_props(&list!["a#top.x.y", attrs! { "class" => "y z" }, "link"]).unwrap();
	assert_eq!(fixed, list!["a", attrs! { "class" => list!["x", "y", "z"], "id" => "top" }, "link"]);

	let fixed = fix_props(&list![".row", ()]).unwrap();
	assert_eq!(fixed, list!["div", attrs! { "class" => list!["row"] }]);
}

#[test]
fn selector_classes_in_presence_map() {
	let fixed = fix_props(&list![".a", attrs! { "class" => attrs! { "b" => true, "a" => false } }]).unwrap();
	assert_eq!(fixed, list!["div", attrs! { "class" => attrs! { "a" => 1, "b" => true } }]);
}

#[test]
fn non_vnodes_pass_through() {
	for value in [list!["hola", "mundo"], Value::from("text"), Value::from(1), Value::Null] {
		assert_eq!(fix_props(&value).unwrap(), value);
	}
}

#[test]
fn children_shapes() {
	assert_eq!(fix_tree(&list!["hola", "mundo"]).unwrap(), list!["hola", "mundo"]);
	assert_eq!(fix_tree(&list!["span", list!["foo"]]).unwrap(), list!["span", (), "foo"]);
	assert_eq!(fix_tree(&list!["div", (), (), false, 0]).unwrap(), list!["div", (), (), (), "0"]);
	assert_eq!(fix_tree(&Value::from(12.5)).unwrap(), Value::from("12.5"));
}

#[test]
fn idempotent() {
	let tree = list!["ul", (), list![list!["li", (), "a"], list!["li", (), "b"]], "c"];
	let once = fix_tree(&tree).unwrap();
	assert_eq!(once, list!["ul", (), list!["li", (), "a"], list!["li", (), "b"], "c"]);
	assert_eq!(fix_tree(&once).unwrap(), once);
	assert_eq!(fix_props(&once).unwrap(), once);
}

fn counter(attrs: Option<&Attrs>, children: &[Value]) -> Result<Value> {
	let count = match attrs.and_then(|attrs| attrs.get("count")) {
		Some(Value::Number(count)) => *count,
		_ => 0.0,
	};
	let children = Value::List(children.to_vec());
	if count < 3.0 {
		Ok(list![Func::component(counter), attrs! { "count" => count + 1.0 }, children])
	} else {
		Ok(list!["stop", attrs! { "count" => count }, children])
	}
}

#[test]
fn recursive_component() {
	let fixed = fix_tree(&list![Func::component(counter), (), 42]).unwrap();
	assert_eq!(fixed, list!["stop", attrs! { "count" => 3 }, "42"]);
}

#[test]
fn bare_component() {
	let component = Func::component(|attrs, children| {
		assert_eq!(attrs, None);
		assert!(children.is_empty());
		Ok(list!["b", (), "x"])
	});
	assert_eq!(fix_tree(&component.into()).unwrap(), list!["b", (), "x"]);
}

#[test]
fn component_lists_are_spliced() {
	let passthrough = Func::component(|_, children| Ok(Value::List(children.to_vec())));
	let tree = list!["div", (), list![passthrough, (), "a", "b"], "c"];
	assert_eq!(fix_tree(&tree).unwrap(), list!["div", (), "a", "b", "c"]);
}

#[test]
fn falsy_roots() {
	assert_eq!(Vnode::normalize(&false.into()).unwrap(), Vnode::Text(String::new()));
	assert_eq!(Vnode::normalize(&"".into()).unwrap(), Vnode::Text(String::new()));
	assert_eq!(Vnode::normalize(&list![]).unwrap(), Vnode::Fragment(vec![]));
}

#[test]
fn invalid_vnodes() {
	assert!(matches!(Vnode::normalize(&Value::Null), Err(Error::InvalidVnode(_))));
	assert!(matches!(fix_tree(&attrs! { "a" => 1 }.into()), Err(Error::InvalidVnode(_))));
	assert!(matches!(fix_tree(&list!["div", (), attrs! {}]), Err(Error::InvalidVnode(_))));

	let nothing = Func::component(|_, _| Ok(Value::Null));
	assert!(matches!(fix_tree(&nothing.into()), Err(Error::InvalidVnode(_))));
}

#[test]
fn component_errors_propagate() {
	let failing = Func::component(|_, _| Err(Error::callback("nope")));
	assert_eq!(fix_tree(&list!["p", (), list![failing, ()]]), Err(Error::Callback("nope".to_owned())));
}
