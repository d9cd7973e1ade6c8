use core::fmt::Display;
use thiserror::Error;

/// Errors surfaced to callers of [`DomDiffer`](`crate::DomDiffer`) entry points.
///
/// Structural mismatches between the live tree and the previous vnode are **not** errors.
/// They are logged and resolved by recreating the affected nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	/// A vnode was required but the given value can't describe one.
	#[error("Invalid vnode, given {0}")]
	InvalidVnode(String),

	/// A registered action or component handler isn't callable.
	#[error("Invalid action `{name}`, given {value}")]
	InvalidComponent { name: String, value: String },

	/// Raised from within a user-supplied component, action or event handler.
	#[error("{0}")]
	Callback(String),
}

impl Error {
	pub fn callback(message: impl Display) -> Self {
		Self::Callback(message.to_string())
	}
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
