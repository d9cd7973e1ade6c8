use futures::executor::LocalPool;
use pretty_assertions::assert_eq;
use sprig_dom::{
	attrs,
	decorate::{self, Attributes, Chain, Listeners},
	list,
	memory::{MemoryDocument, Node},
	Decorate, DomDiffer, Func, Value, Wait,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

mod logging_;

fn differ(decorator: impl Decorate<MemoryDocument> + 'static) -> (MemoryDocument, LocalPool, DomDiffer<MemoryDocument>) {
	logging_::init();
	let document = MemoryDocument::new();
	let pool = LocalPool::new();
	let differ = DomDiffer::new(document.clone(), pool.spawner()).with_decorator(decorator);
	(document, pool, differ)
}

#[test]
fn structured_attributes() {
	let (document, _pool, differ) = differ(decorate::defaults());
	let body = document.body();
	differ
		.mount(
			&body,
			&list![
				"div.a",
				attrs! {
					"class" => attrs! { "b" => true, "c" => false },
					"style" => attrs! { "fontSize" => "12px", "color" => () },
					"data" => attrs! { "userId" => 7, "tags" => list!["x"] },
				}
			],
		)
		.unwrap();
	assert_eq!(body.inner_html(), r#"<div class="a b" style="font-size: 12px" data-user-id="7" data-tags="[&quot;x&quot;]"></div>"#);
}

#[test]
fn prefixed_datasets() {
	let (document, _pool, differ) = differ(decorate::defaults());
	let body = document.body();
	differ.mount(&body, &list!["p", attrs! { "aria" => attrs! { "hidden" => true } }]).unwrap();
	assert_eq!(body.inner_html(), r#"<p data-aria-hidden="true"></p>"#);
}

#[test]
fn helpers_take_precedence() {
	let attributes = Attributes::<MemoryDocument>::new().with_helper("points", |_, _, value| match value {
		Value::List(points) => Some(points.iter().filter_map(Value::to_text).collect::<Vec<_>>().join(" ").into()),
		_ => None,
	});
	let (document, _pool, differ) = differ(attributes);
	let body = document.body();
	differ.mount(&body, &list!["polyline", attrs! { "points" => list![1, 2, 3, 4] }]).unwrap();
	assert_eq!(body.inner_html(), r#"<polyline points="1 2 3 4"></polyline>"#);
}

#[test]
fn event_listeners() {
	let (document, _pool, differ) = differ(decorate::defaults());
	let body = document.body();
	let clicks = Rc::new(RefCell::new(Vec::new()));
	let onclick = Func::new({
		let clicks = Rc::clone(&clicks);
		move |args| {
			let event = args[0].as_map().cloned().unwrap_or_default();
			clicks.borrow_mut().push(event.get("type").cloned().unwrap_or_default());
			Ok(event.get("x").cloned().unwrap_or_default())
		}
	});
	let root = differ.mount(&body, &list!["button", attrs! { "onclick" => onclick }]).unwrap();
	let button = root.as_node().unwrap();

	assert!(button.is_listening("click"));
	assert_eq!(body.inner_html(), "<button></button>");
	assert_eq!(document.dispatch(button, "click", attrs! { "x" => 3 }).unwrap(), Some(Value::from(3)));
	assert_eq!(document.dispatch(button, "keydown", attrs! {}).unwrap(), None);
	assert_eq!(*clicks.borrow(), vec![Value::from("click")]);
}

#[test]
fn interceptor_vetoes() {
	let allowed = Rc::new(Cell::new(false));
	let listeners = Listeners::new().with_interceptor(Func::new({
		let allowed = Rc::clone(&allowed);
		move |_| Ok(allowed.get().into())
	}));
	let (document, _pool, differ) = differ(listeners);

	let calls = Rc::new(Cell::new(0));
	let onclick = Func::new({
		let calls = Rc::clone(&calls);
		move |_| {
			calls.set(calls.get() + 1);
			Ok(Value::Null)
		}
	});
	let root = differ.mount(&document.body(), &list!["button", attrs! { "onclick" => onclick }]).unwrap();
	let button = root.as_node().unwrap();

	document.dispatch(button, "click", attrs! {}).unwrap();
	assert_eq!(calls.get(), 0);
	allowed.set(true);
	document.dispatch(button, "click", attrs! {}).unwrap();
	assert_eq!(calls.get(), 1);
}

#[test]
fn lifecycle_callbacks() {
	let (document, mut pool, differ) = differ(decorate::defaults());
	let body = document.body();
	let log = Rc::new(RefCell::new(Vec::new()));
	let callback = |name: &'static str| {
		let log = Rc::clone(&log);
		Func::new(move |args| {
			let node = match &args[0] {
				Value::Ref(node_ref) => node_ref.current::<Node>(),
				_ => None,
			};
			log.borrow_mut().push((name, node.map(|node| node.tag_name())));
			Ok(Value::Null)
		})
	};

	let item = |title: &str| {
		list![
			"li",
			attrs! {
				"title" => title,
				"oncreate" => callback("create"),
				"onupdate" => callback("update"),
				"ondestroy" => callback("destroy"),
			}
		]
	};
	let prev = list!["ul", (), item("a"), item("b")];
	let root = differ.mount(&body, &prev).unwrap();
	assert_eq!(*log.borrow(), vec![("create", Some("LI".to_owned())), ("create", Some("LI".to_owned()))]);
	log.borrow_mut().clear();

	let next = list!["ul", (), item("c")];
	differ.reconcile(&root, &prev, &next, false).unwrap();
	pool.run_until_stalled();
	assert_eq!(body.inner_html(), r#"<ul><li title="c"></li></ul>"#);
	assert!(log.borrow().contains(&("update", Some("LI".to_owned()))));
	assert!(log.borrow().contains(&("destroy", Some("LI".to_owned()))));
	assert_eq!(log.borrow().iter().filter(|(name, _)| *name == "destroy").count(), 1);
}

#[test]
fn lifecycle_callbacks_are_swapped_not_stacked() {
	let (document, mut pool, differ) = differ(decorate::defaults());
	let updates = Rc::new(Cell::new(0));
	let destroys = Rc::new(Cell::new(0));
	let render = |title: u32| {
		let counter = |count: &Rc<Cell<usize>>| {
			let count = Rc::clone(count);
			Func::new(move |_| {
				count.set(count.get() + 1);
				Ok(Value::Null)
			})
		};
		list![
			"p",
			attrs! {
				"title" => title,
				"onupdate" => counter(&updates),
				"ondestroy" => counter(&destroys),
			}
		]
	};

	let mut prev = render(0);
	let root = differ.mount(&document.body(), &prev).unwrap();
	for title in 1..=3 {
		let next = render(title);
		differ.reconcile(&root, &prev, &next, false).unwrap();
		prev = next;
	}
	assert_eq!(updates.get(), 3);

	pool.run_until(differ.destroy(&root, Wait::immediate()));
	assert_eq!(destroys.get(), 1);
	assert_eq!(document.body().inner_html(), "");
}

/// Upper-cases text children of `<shout>` elements by rendering a `<b>` instead.
struct Shout;
impl Decorate<MemoryDocument> for Shout {
	fn element(
		&self,
		_document: &MemoryDocument,
		element: Node,
		tag: &str,
		_attrs: Option<&sprig_dom::Attrs>,
		children: &[sprig_dom::Vnode],
	) -> sprig_dom::Result<sprig_dom::Created<Node>> {
		if tag != "shout" {
			return Ok(sprig_dom::Created::Node(element));
		}
		let text = children
			.iter()
			.filter_map(|child| match child {
				sprig_dom::Vnode::Text(text) => Some(text.to_uppercase()),
				_ => None,
			})
			.collect::<String>();
		Ok(sprig_dom::Created::Render(list!["b", (), text]))
	}
}

#[test]
fn chains() {
	let (document, _pool, differ) = differ(Chain::<MemoryDocument>::new().with(Shout).with(Attributes::new()).with(Listeners::new()));
	let body = document.body();
	differ.mount(&body, &list!["div", attrs! { "class" => list!["x", "y"] }, list!["shout", (), "hey"]]).unwrap();
	assert_eq!(body.inner_html(), r#"<div class="x y"><b>HEY</b></div>"#);
}
