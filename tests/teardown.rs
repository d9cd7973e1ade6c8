use futures::{
	channel::oneshot,
	executor::LocalPool,
	task::LocalSpawnExt as _,
	FutureExt as _,
};
use pretty_assertions::assert_eq;
use sprig_dom::{list, memory::MemoryDocument, Document as _, DomDiffer, Lifecycle, Teardown, Wait};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

mod logging_;

fn differ() -> (MemoryDocument, LocalPool, DomDiffer<MemoryDocument>) {
	logging_::init();
	let document = MemoryDocument::new();
	let pool = LocalPool::new();
	let differ = DomDiffer::new(document.clone(), pool.spawner());
	(document, pool, differ)
}

#[test]
fn hooks_run_once_in_order() {
	let (document, mut pool, differ) = differ();
	let body = document.body();
	let root = differ.mount(&body, &list!["p", ()]).unwrap();
	let p = root.as_node().unwrap().clone();

	let log = Rc::new(RefCell::new(Vec::new()));
	for lifecycle in [Lifecycle::Exit, Lifecycle::Teardown, Lifecycle::Destroy] {
		let log = Rc::clone(&log);
		document.state(&p).on(lifecycle, move |node| {
			log.borrow_mut().push((lifecycle, node.parent().is_some()));
			None
		});
	}

	let teardown = differ.destroy(&root, Wait::immediate());
	assert!(document.state(&p).is_dirty());
	assert_eq!(p.parent(), Some(body.clone()));
	assert!(log.borrow().is_empty());

	assert_eq!(pool.run_until(teardown), Teardown::Detached);
	assert_eq!(*log.borrow(), vec![(Lifecycle::Destroy, true), (Lifecycle::Teardown, true), (Lifecycle::Exit, true)]);
	assert_eq!(p.parent(), None);
	assert!(body.child_nodes().is_empty());
}

#[test]
fn cancellation_keeps_the_node() {
	let (document, mut pool, differ) = differ();
	let body = document.body();
	let root = differ.mount(&body, &list!["p", ()]).unwrap();

	let destroyed = Rc::new(Cell::new(false));
	document.state(root.as_node().unwrap()).on(Lifecycle::Destroy, {
		let destroyed = Rc::clone(&destroyed);
		move |_| {
			destroyed.set(true);
			None
		}
	});

	assert_eq!(pool.run_until(differ.destroy(&root, Wait::cancel())), Teardown::Cancelled);
	assert!(!destroyed.get());
	assert_eq!(body.inner_html(), "<p></p>");
}

#[test]
fn waiting_for_a_signal() {
	let (document, mut pool, differ) = differ();
	let body = document.body();
	let root = differ.mount(&body, &list!["p", ()]).unwrap();

	let (signal, signalled) = oneshot::channel::<()>();
	let teardown = differ.destroy(
		&root,
		Wait::until(&differ, async move {
			let _ = signalled.await;
		}),
	);
	let outcome = Rc::new(Cell::new(None));
	pool.spawner()
		.spawn_local({
			let outcome = Rc::clone(&outcome);
			async move { outcome.set(Some(teardown.await)) }
		})
		.unwrap();

	pool.run_until_stalled();
	assert_eq!(outcome.get(), None);
	assert_eq!(body.inner_html(), "<p></p>");

	signal.send(()).unwrap();
	pool.run_until_stalled();
	assert_eq!(outcome.get(), Some(Teardown::Detached));
	assert_eq!(body.inner_html(), "");
}

#[test]
fn exit_hooks_delay_detachment() {
	let (document, mut pool, differ) = differ();
	let body = document.body();
	let root = differ.mount(&body, &list!["p", ()]).unwrap();

	let (finished, animation) = oneshot::channel::<()>();
	let animation = RefCell::new(Some(animation));
	document.state(root.as_node().unwrap()).on(Lifecycle::Exit, move |_| {
		let animation = animation.borrow_mut().take()?;
		Some(
			async move {
				let _ = animation.await;
			}
			.boxed_local(),
		)
	});

	let teardown = differ.destroy(&root, Wait::immediate());
	let outcome = Rc::new(Cell::new(None));
	pool.spawner()
		.spawn_local({
			let outcome = Rc::clone(&outcome);
			async move { outcome.set(Some(teardown.await)) }
		})
		.unwrap();

	pool.run_until_stalled();
	assert_eq!(outcome.get(), None);
	assert_eq!(body.inner_html(), "<p></p>");

	finished.send(()).unwrap();
	pool.run_until_stalled();
	assert_eq!(outcome.get(), Some(Teardown::Detached));
	assert_eq!(body.inner_html(), "");
}

#[test]
fn fragments_fan_out() {
	let (document, mut pool, differ) = differ();
	let container = document.create_element("div", false);
	let root = differ.mount(&container, &list![list!["a", ()], list!["b", ()], "c"]).unwrap();
	assert!(root.as_fragment().is_some());
	assert_eq!(container.inner_html(), "<a></a><b></b>c");

	let destroyed = Rc::new(RefCell::new(Vec::new()));
	for node in root.nodes() {
		let destroyed = Rc::clone(&destroyed);
		document.state(&node).on(Lifecycle::Destroy, move |node| {
			destroyed.borrow_mut().push(node.clone());
			None
		});
	}

	assert_eq!(pool.run_until(differ.destroy(&root, Wait::immediate())), Teardown::Detached);
	assert_eq!(*destroyed.borrow(), root.nodes());
	assert!(container.child_nodes().is_empty());
}

#[test]
fn teardown_releases_subtrees() {
	let (document, mut pool, differ) = differ();
	let body = document.body();
	let root = differ.mount(&body, &list!["div", (), list!["span", ()]]).unwrap();
	let span = root.as_node().unwrap().child_nodes()[0].clone();
	document.listen(&span, "click");

	assert_eq!(pool.run_until(differ.destroy(&root, Wait::immediate())), Teardown::Detached);
	assert!(!span.is_listening("click"));
}
