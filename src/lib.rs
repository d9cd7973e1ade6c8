#![doc(html_root_url = "https://docs.rs/sprig-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A positional virtual-tree differ.
//!
//! Vnodes are plain [`Value`]s shaped like `["tag#id.class", { "attr": value }, ...children]`.
//! A [`DomDiffer`] materializes them through a [`Document`] backend and patches the resulting live tree in place
//! when given the previous and next vnode. Removed nodes are torn down asynchronously on the differ's executor,
//! which lets [lifecycle hooks](`Lifecycle`) delay detachment, for example to run exit animations.
//!
//! Stateful [`View`]s render their own subtree, and a [`Thunk`] embeds several of them in one larger tree.
//!
//! [`memory::MemoryDocument`] is an in-process backend. On `wasm32`, `web::WebDocument` drives the browser DOM.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attrs;
mod create;
pub mod decorate;
mod diff;
pub mod document;
mod error;
pub mod fragment;
pub mod load;
pub mod memory;
mod teardown;
pub mod thunk;
pub mod value;
pub mod view;
pub mod vnode;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use attrs::{assign_props, update_props};
pub use diff::DomDiffer;
pub use document::{Created, Decorate, Document, Lifecycle, NodeState, NodeType};
pub use error::{Error, Result};
pub use fragment::{Fragment, Mounted};
pub use teardown::{Detach, Teardown, Wait};
pub use thunk::Thunk;
pub use value::{is_diff, Attrs, Func, NodeRef, Value};
pub use view::{Actions, Subscription, View};
pub use vnode::{fix_props, fix_tree, is_vnode, Vnode};
