use futures::{channel::oneshot, executor::LocalPool, task::LocalSpawnExt as _, FutureExt as _};
use pretty_assertions::assert_eq;
use sprig_dom::{
	attrs, decorate, list,
	memory::{MemoryDocument, Node},
	Attrs, DomDiffer, Error, Func, Teardown, Value, View, Wait,
};
use std::{cell::RefCell, rc::Rc};

mod logging_;

fn count_of(state: &Value) -> f64 {
	match state.as_map().and_then(|state| state.get("count")) {
		Some(Value::Number(count)) => *count,
		_ => 0.0,
	}
}

fn counter() -> (MemoryDocument, LocalPool, View<MemoryDocument>) {
	logging_::init();
	let document = MemoryDocument::new();
	let pool = LocalPool::new();
	let differ = DomDiffer::new(document.clone(), pool.spawner()).with_decorator(decorate::defaults());

	let actions = attrs! {
		"increment" => Func::new(|args| Ok(attrs! { "count" => count_of(&args[0]) + 1.0 }.into())),
		"peek" => Func::new(|args| Ok(count_of(&args[0]).into())),
		"add" => Func::new(|args| {
			let amount = match args.get(1) {
				Some(Value::List(args)) => args
					.iter()
					.filter_map(|arg| match arg {
						Value::Number(amount) => Some(*amount),
						_ => None,
					})
					.sum::<f64>(),
				_ => 0.0,
			};
			Ok(attrs! { "count" => count_of(&args[0]) + amount }.into())
		}),
	};
	let view = View::new(differ, attrs! { "count" => 0 }, actions, |state, actions| {
		Ok(list!["button", attrs! { "onclick" => actions.handler("increment") }, state.get("count").cloned().unwrap_or_default()])
	})
	.unwrap();
	(document, pool, view)
}

fn button(document: &MemoryDocument) -> Node {
	document.body().child_nodes()[0].clone()
}

#[test]
fn event_handlers_dispatch_actions() {
	let (document, mut pool, view) = counter();
	view.mount(&document.body()).unwrap();
	assert_eq!(document.body().inner_html(), "<button>0</button>");

	assert_eq!(document.dispatch(&button(&document), "click", Attrs::new()).unwrap(), Some(Value::Null));
	pool.run_until_stalled();
	assert_eq!(document.body().inner_html(), "<button>1</button>");
	assert_eq!(view.state(), attrs! { "count" => 1 });

	document.dispatch(&button(&document), "click", Attrs::new()).unwrap();
	pool.run_until_stalled();
	assert_eq!(document.body().inner_html(), "<button>2</button>");
}

#[test]
fn dispatch_results() {
	let (document, mut pool, view) = counter();
	view.mount(&document.body()).unwrap();

	assert_eq!(pool.run_until(view.dispatch("add", vec![2.into(), 3.into()])).unwrap(), Value::from(attrs! { "count" => 5 }));
	assert_eq!(document.body().inner_html(), "<button>5</button>");

	assert_eq!(pool.run_until(view.actions().dispatch("peek", vec![])).unwrap(), Value::from(5));
	assert_eq!(document.body().inner_html(), "<button>5</button>");

	assert!(matches!(pool.run_until(view.dispatch("missing", vec![])), Err(Error::InvalidComponent { name, .. }) if name == "missing"));
}

#[test]
fn actions_must_be_functions() {
	let document = MemoryDocument::new();
	let pool = LocalPool::new();
	let differ = DomDiffer::new(document, pool.spawner());
	let view = View::new(differ, Attrs::new(), attrs! { "oops" => 1 }, |_, _| Ok(Value::Null));
	assert!(matches!(view, Err(Error::InvalidComponent { name, .. }) if name == "oops"));
}

#[test]
fn subscribers_are_awaited() {
	let (document, mut pool, view) = counter();
	view.mount(&document.body()).unwrap();

	let seen = Rc::new(RefCell::new(Vec::new()));
	let gate: Rc<RefCell<Option<oneshot::Receiver<()>>>> = Rc::default();
	let subscription = view.subscribe({
		let seen = Rc::clone(&seen);
		let gate = Rc::clone(&gate);
		move |state: &Attrs| {
			seen.borrow_mut().push(state.get("count").cloned().unwrap_or_default());
			let gate = gate.borrow_mut().take();
			async move {
				if let Some(gate) = gate {
					let _ = gate.await;
				}
			}
			.boxed_local()
		}
	});
	pool.run_until_stalled();
	assert_eq!(*seen.borrow(), vec![Value::from(0)]);

	let (open, receiver) = oneshot::channel();
	*gate.borrow_mut() = Some(receiver);
	let patched = view.patch(attrs! { "count" => 5 });
	pool.spawner().spawn_local(async move { patched.await.unwrap() }).unwrap();

	pool.run_until_stalled();
	assert_eq!(*seen.borrow(), vec![Value::from(0), Value::from(5)]);
	assert_eq!(document.body().inner_html(), "<button>0</button>");

	open.send(()).unwrap();
	pool.run_until_stalled();
	assert_eq!(document.body().inner_html(), "<button>5</button>");

	subscription.unsubscribe();
	pool.run_until(view.patch(attrs! { "count" => 6 })).unwrap();
	assert_eq!(seen.borrow().len(), 2);
	assert_eq!(document.body().inner_html(), "<button>6</button>");
}

#[test]
fn patching_before_mount_only_changes_state() {
	let (document, mut pool, view) = counter();
	pool.run_until(view.patch(attrs! { "count" => 3 })).unwrap();
	assert_eq!(view.target(), None);

	view.mount(&document.body()).unwrap();
	assert_eq!(document.body().inner_html(), "<button>3</button>");
}

#[test]
fn unmount() {
	let (document, mut pool, view) = counter();
	let button = view.mount(&document.body()).unwrap();
	assert_eq!(view.target(), Some(button.clone()));
	assert!(button.as_node().unwrap().is_listening("click"));

	let teardown = view.unmount(Wait::immediate()).unwrap();
	assert_eq!(pool.run_until(teardown), Teardown::Detached);
	assert_eq!(document.body().inner_html(), "");
	assert!(!button.as_node().unwrap().is_listening("click"));
	assert_eq!(view.target(), None);
	assert!(view.unmount(Wait::immediate()).is_none());
}

#[test]
fn defer_sees_finished_rerenders() {
	let (document, mut pool, view) = counter();
	view.mount(&document.body()).unwrap();

	document.dispatch(&button(&document), "click", Attrs::new()).unwrap();
	assert_eq!(document.body().inner_html(), "<button>0</button>");

	let html = pool.run_until(view.defer({
		let document = document.clone();
		move || document.body().inner_html()
	}));
	assert_eq!(html, "<button>1</button>");
}
