//! Asynchronous, cooperative node removal.
//!
//! Removal is always deferred by at least one executor turn. A [`Wait`] strategy then decides when (or whether)
//! the nodes are actually detached, which is how exit animations get time to run.

use crate::{
	document::{Document, Lifecycle},
	fragment::Mounted,
	DomDiffer,
};
use core::{
	fmt::{self, Debug, Formatter},
	future::Future,
	pin::Pin,
	task::{Context, Poll},
};
use futures::{
	channel::oneshot,
	future::{join_all, LocalBoxFuture},
	FutureExt as _,
};
use tracing::{instrument, trace, trace_span, Instrument as _};

/// Handed to a [`Wait`] strategy. Detachment proceeds once [`Detach::detach`] is called.
///
/// Dropping it instead cancels detachment for good.
#[derive(Debug)]
pub struct Detach(oneshot::Sender<()>);

impl Detach {
	pub fn detach(self) {
		// The teardown future may have been dropped already, in which case there's nothing left to do.
		let _ = self.0.send(());
	}
}

/// Decides when a node being torn down is detached.
pub struct Wait(Box<dyn FnOnce(Detach)>);

impl Wait {
	pub fn new(strategy: impl FnOnce(Detach) + 'static) -> Self {
		Self(Box::new(strategy))
	}

	/// Detaches right away.
	#[must_use]
	pub fn immediate() -> Self {
		Self::new(Detach::detach)
	}

	/// Never detaches. The teardown resolves as [`Teardown::Cancelled`].
	#[must_use]
	pub fn cancel() -> Self {
		Self::new(drop)
	}

	/// Detaches once `future` completes, which runs on `differ`'s executor.
	pub fn until<D: Document>(differ: &DomDiffer<D>, future: impl Future<Output = ()> + 'static) -> Self {
		let differ = differ.clone();
		Self::new(move |detach| {
			differ.spawn(async move {
				future.await;
				detach.detach();
			});
		})
	}
}

impl Default for Wait {
	fn default() -> Self {
		Self::immediate()
	}
}

impl Debug for Wait {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("Wait(..)")
	}
}

/// How a teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
	/// Teardown hooks ran and the nodes were detached.
	Detached,
	/// The [`Wait`] strategy dropped its [`Detach`] handle. The nodes stay attached, but are ignored by matching.
	Cancelled,
}

impl<D: Document> DomDiffer<D> {
	/// Tears `root` down asynchronously.
	///
	/// The affected nodes are excluded from positional matching right away. Once the returned future is polled,
	/// it yields once, then hands a [`Detach`] to `wait`. After detachment is signalled, each node runs its
	/// [`Destroy`](`Lifecycle::Destroy`), [`Teardown`](`Lifecycle::Teardown`) and [`Exit`](`Lifecycle::Exit`) hooks
	/// in that order (awaiting any futures they return) and is then detached from its parent.
	///
	/// A [`Fragment`](`crate::Fragment`) fans out over all of its nodes and resolves once each of them is removed.
	///
	/// If `wait` holds on to its [`Detach`] without ever calling it, the returned future never resolves.
	#[instrument(skip(self, wait))]
	pub fn destroy(&self, root: &Mounted<D::Node>, wait: Wait) -> LocalBoxFuture<'static, Teardown> {
		let nodes = root.nodes();
		for node in &nodes {
			self.document.state(node).mark_dirty();
		}

		let document = self.document.clone();
		async move {
			YieldNow::default().await;

			let (sender, receiver) = oneshot::channel();
			(wait.0)(Detach(sender));
			if receiver.await.is_err() {
				trace!("Detachment cancelled.");
				return Teardown::Cancelled;
			}

			join_all(nodes.into_iter().map(|node| remove_node(document.clone(), node))).await;
			Teardown::Detached
		}
		.in_current_span()
		.boxed_local()
	}
}

async fn remove_node<D: Document>(document: D, node: D::Node) {
	YieldNow::default().await;

	let span = trace_span!("Removing node", ?node);
	let state = document.state(&node);
	for lifecycle in [Lifecycle::Destroy, Lifecycle::Teardown, Lifecycle::Exit] {
		let pending = span.in_scope(|| state.fire(lifecycle, &node));
		join_all(pending).await;
	}

	let _enter = span.enter();
	match document.parent_node(&node) {
		Some(parent) => document.remove_child(&parent, &node),
		None => trace!("Already detached."),
	}
	release_tree(&document, &node);
}

/// Releases `node` and its descendants from the backend's bookkeeping.
pub(crate) fn release_tree<D: Document>(document: &D, node: &D::Node) {
	for child in document.child_nodes(node) {
		release_tree(document, &child);
	}
	document.release(node);
}

/// Resolves after yielding to the executor once.
pub(crate) fn next_tick() -> impl Future<Output = ()> {
	YieldNow::default()
}

/// Yields to the executor exactly once.
#[derive(Default)]
struct YieldNow(bool);

impl Future for YieldNow {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.0 {
			Poll::Ready(())
		} else {
			self.0 = true;
			cx.waker().wake_by_ref();
			Poll::Pending
		}
	}
}
