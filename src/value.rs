//! Dynamic vnode input.
//!
//! Vnodes are written as nested [`Value`]s, mirroring the array shape
//! `[tag, attrs, ...children]`. The [`list!`](`crate::list`) and [`attrs!`](`crate::attrs`) macros keep this terse:
//!
//! ```
//! use sprig_dom::{attrs, list, Value};
//!
//! let vnode = list!["ul.menu", attrs! { "id" => "main" }, list!["li", (), "one"], list!["li", (), 2]];
//! assert!(matches!(vnode, Value::List(_)));
//! ```

use crate::Result;
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Display, Formatter},
};
use serde::{Serialize, Serializer};
use std::rc::Rc;

#[derive(Clone, Default, PartialEq)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	Str(String),
	List(Vec<Value>),
	Map(Attrs),
	Func(Func),
	Ref(NodeRef),
}

impl Value {
	/// The emptiness predicate shared by attribute removal and child filtering.
	///
	/// `null`, `false`, `""` and empty lists or maps are empty.
	/// Numbers (including `0`), `true`, functions and refs are not.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		match self {
			Value::Null | Value::Bool(false) => true,
			Value::Str(text) => text.is_empty(),
			Value::List(items) => items.is_empty(),
			Value::Map(attrs) => attrs.is_empty(),
			Value::Bool(true) | Value::Number(_) | Value::Func(_) | Value::Ref(_) => false,
		}
	}

	/// Text content for scalar values.
	#[must_use]
	pub fn to_text(&self) -> Option<String> {
		match self {
			Value::Str(text) => Some(text.clone()),
			Value::Number(number) => Some(number.to_string()),
			Value::Bool(flag) => Some(flag.to_string()),
			Value::Null | Value::List(_) | Value::Map(_) | Value::Func(_) | Value::Ref(_) => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(text) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_map(&self) -> Option<&Attrs> {
		match self {
			Value::Map(attrs) => Some(attrs),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_func(&self) -> Option<&Func> {
		match self {
			Value::Func(func) => Some(func),
			_ => None,
		}
	}

	/// Deep truthiness, as used for presence maps and interceptor results.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Number(number) => *number != 0.0 && !number.is_nan(),
			value => !value.is_empty(),
		}
	}
}

/// Structural inequality between two attribute values.
///
/// Functions always differ, as does any pair of mismatched types.
/// Lists are compared by length and unordered membership, maps by their sorted key sets and then value by value.
#[allow(clippy::float_cmp)]
#[must_use]
pub fn is_diff(prev: &Value, next: &Value) -> bool {
	match (prev, next) {
		(Value::Func(_), _) | (_, Value::Func(_)) => true,
		(Value::Null, Value::Null) => false,
		(Value::Bool(a), Value::Bool(b)) => a != b,
		(Value::Number(a), Value::Number(b)) => a != b,
		(Value::Str(a), Value::Str(b)) => a != b,
		(Value::List(a), Value::List(b)) => a.len() != b.len() || a.iter().any(|x| b.iter().all(|y| is_diff(x, y))),
		(Value::Map(a), Value::Map(b)) => {
			let mut keys_a = a.keys().collect::<Vec<_>>();
			let mut keys_b = b.keys().collect::<Vec<_>>();
			keys_a.sort_unstable();
			keys_b.sort_unstable();
			keys_a != keys_b || a.iter().any(|(key, x)| b.get(key).map_or(true, |y| is_diff(x, y)))
		}
		(Value::Ref(a), Value::Ref(b)) => a != b,
		_ => true,
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("null"),
			Value::Bool(flag) => Debug::fmt(flag, f),
			Value::Number(number) => Display::fmt(number, f),
			Value::Str(text) => Debug::fmt(text, f),
			Value::List(items) => f.debug_list().entries(items).finish(),
			Value::Map(attrs) => Debug::fmt(attrs, f),
			Value::Func(func) => Debug::fmt(func, f),
			Value::Ref(node_ref) => Debug::fmt(node_ref, f),
		}
	}
}

/// JSON text, with functions and refs written as `null`.
impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match serde_json::to_string(self) {
			Ok(json) => f.write_str(&json),
			Err(_) => Err(fmt::Error),
		}
	}
}

impl Serialize for Value {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Value::Null | Value::Func(_) | Value::Ref(_) => serializer.serialize_unit(),
			Value::Bool(flag) => serializer.serialize_bool(*flag),
			Value::Number(number) => serializer.serialize_f64(*number),
			Value::Str(text) => serializer.serialize_str(text),
			Value::List(items) => serializer.collect_seq(items),
			Value::Map(attrs) => serializer.collect_map(attrs.iter()),
		}
	}
}

impl From<()> for Value {
	fn from((): ()) -> Self {
		Value::Null
	}
}
impl From<bool> for Value {
	fn from(flag: bool) -> Self {
		Value::Bool(flag)
	}
}
impl From<i32> for Value {
	fn from(number: i32) -> Self {
		Value::Number(number.into())
	}
}
impl From<u32> for Value {
	fn from(number: u32) -> Self {
		Value::Number(number.into())
	}
}
impl From<f64> for Value {
	fn from(number: f64) -> Self {
		Value::Number(number)
	}
}
impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Value::Str(text.to_owned())
	}
}
impl From<String> for Value {
	fn from(text: String) -> Self {
		Value::Str(text)
	}
}
impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::List(items)
	}
}
impl From<Attrs> for Value {
	fn from(attrs: Attrs) -> Self {
		Value::Map(attrs)
	}
}
impl From<Func> for Value {
	fn from(func: Func) -> Self {
		Value::Func(func)
	}
}
impl From<NodeRef> for Value {
	fn from(node_ref: NodeRef) -> Self {
		Value::Ref(node_ref)
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// An insertion-ordered attribute mapping.
///
/// Inserting an existing key replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attrs(Vec<(String, Value)>);

impl Attrs {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		let key = key.into();
		let value = value.into();
		match self.0.iter_mut().find(|(k, _)| *k == key) {
			Some((_, slot)) => Some(core::mem::replace(slot, value)),
			None => {
				self.0.push((key, value));
				None
			}
		}
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		let index = self.0.iter().position(|(k, _)| k == key)?;
		Some(self.0.remove(index).1)
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|(k, _)| k.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Shallowly merges `other` into `self`, keeping the position of existing keys.
	pub fn merge(&mut self, other: Attrs) {
		for (key, value) in other {
			self.insert(key, value);
		}
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attrs {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		let mut attrs = Attrs::new();
		for (key, value) in iter {
			attrs.insert(key, value);
		}
		attrs
	}
}

impl IntoIterator for Attrs {
	type Item = (String, Value);
	type IntoIter = std::vec::IntoIter<(String, Value)>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

type Callable = dyn Fn(&[Value]) -> Result<Value>;

/// A shared callable: component, event handler, action or lifecycle callback.
///
/// Equality is identity.
#[derive(Clone)]
pub struct Func(Rc<Callable>);

impl Func {
	pub fn new(f: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
		Self(Rc::new(f))
	}

	/// Wraps a component, which is called with `(attrs, children)`.
	pub fn component(f: impl Fn(Option<&Attrs>, &[Value]) -> Result<Value> + 'static) -> Self {
		Self::new(move |args| {
			let attrs = args.first().and_then(Value::as_map);
			let children = match args.get(1) {
				Some(Value::List(children)) => children.as_slice(),
				_ => &[],
			};
			f(attrs, children)
		})
	}

	/// # Errors
	///
	/// Whatever the wrapped function returns.
	pub fn call(&self, args: &[Value]) -> Result<Value> {
		(self.0)(args)
	}

	fn address(&self) -> *const () {
		Rc::as_ptr(&self.0).cast::<()>()
	}
}

impl PartialEq for Func {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address()
	}
}

impl Debug for Func {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Func").field(&self.address()).finish()
	}
}

/// Receives the live node of an element carrying it as `ref` attribute, once that element is created.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<Rc<dyn Any>>>>);

impl NodeRef {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn current<N: Clone + 'static>(&self) -> Option<N> {
		self.0.borrow().as_ref().and_then(|current| current.downcast_ref::<N>()).cloned()
	}

	pub fn set<N: 'static>(&self, node: N) {
		*self.0.borrow_mut() = Some(Rc::new(node));
	}

	pub fn clear(&self) {
		self.0.borrow_mut().take();
	}
}

impl PartialEq for NodeRef {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for NodeRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeRef").field("set", &self.0.borrow().is_some()).finish()
	}
}

/// Builds a [`Value::List`], converting each item with [`Value::from`].
#[macro_export]
macro_rules! list {
	($($item:expr),* $(,)?) => {
		$crate::Value::List(::std::vec![$($crate::Value::from($item)),*])
	};
}

/// Builds an [`Attrs`] mapping.
#[macro_export]
macro_rules! attrs {
	($($key:expr => $value:expr),* $(,)?) => {{
		#[allow(unused_mut)]
		let mut attrs = $crate::Attrs::new();
		$(attrs.insert($key, $value);)*
		attrs
	}};
}
