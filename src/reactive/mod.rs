//! Deep reactivity for plain data.
//!
//! [`Scope::reactive`] turns JSON-like data into a tree of [`Node`]s where
//! every object field and every array slot is its own [`TrackedValue`], and
//! every aggregate carries one extra *shape* value standing for its key set
//! or length. Reading a field depends on that field only; enumerating keys or
//! asking for a length depends on the shape only.
//!
//! ```
//! use serde_json::json;
//! use tether::{ManualScheduler, Scope};
//!
//! let scheduler = ManualScheduler::new();
//! let scope = Scope::new(scheduler.clone());
//!
//! let user = scope.reactive(json!({ "name": "Ada" }));
//! let user = user.as_object().unwrap().clone();
//!
//! let greeting = scope.derive({
//! 	let user = user.clone();
//! 	move |_, _| format!("hello {}", user.get("name").unwrap().as_str().unwrap_or("?"))
//! });
//!
//! user.set("name", "Grace");
//! scheduler.tick();
//! assert_eq!(greeting.read().as_deref(), Some("hello Grace"));
//! ```

mod array;
mod object;
mod raw;

use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

pub use array::ReactiveArray;
pub use object::ReactiveObject;
pub use raw::{RawArray, RawNode, RawObject};

use crate::scope::ScopeInner;
use crate::{Scope, TrackedValue};

/// One position of a reactive tree.
#[derive(Clone)]
pub enum Node {
	/// `null`, a boolean, a number or a string.
	Value(Value),
	Object(ReactiveObject),
	Array(ReactiveArray),
	/// An aggregate kept as plain data, see [`unreactive`].
	Unreactive(Unreactive),
}

/// Plain data that [`Scope::reactive`] must leave alone.
#[derive(Clone)]
pub struct Unreactive(Rc<Value>);

/// Opts `value` out of deep reactivity: it is stored as a single opaque
/// leaf and replaced only as a whole.
pub fn unreactive(value: Value) -> Unreactive {
	Unreactive(Rc::new(value))
}

impl Unreactive {
	pub fn get(&self) -> &Value {
		&self.0
	}
}

impl std::ops::Deref for Unreactive {
	type Target = Value;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl fmt::Debug for Unreactive {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Unreactive").field(&*self.0).finish()
	}
}

/// What nested values get wrapped with.
#[derive(Clone)]
pub struct WrapContext {
	scope: Weak<ScopeInner>,
}

impl WrapContext {
	pub(crate) fn cell(&self, node: Node) -> TrackedValue<Node> {
		TrackedValue::new(self.scope.clone(), node)
	}

	pub(crate) fn shape(&self) -> TrackedValue<u64> {
		TrackedValue::new(self.scope.clone(), 0)
	}

	pub(crate) fn wrap(&self, value: Value) -> Node {
		match value {
			Value::Object(map) => Node::Object(ReactiveObject::from_map(self, map)),
			Value::Array(items) => Node::Array(ReactiveArray::from_vec(self, items)),
			leaf => Node::Value(leaf),
		}
	}
}

/// Anything that can be stored in a reactive tree. Already reactive nodes
/// are stored as they are.
pub trait IntoNode {
	fn into_node(self, cx: &WrapContext) -> Node;
}

impl IntoNode for Value {
	fn into_node(self, cx: &WrapContext) -> Node {
		cx.wrap(self)
	}
}

impl IntoNode for Node {
	fn into_node(self, _: &WrapContext) -> Node {
		self
	}
}

impl IntoNode for ReactiveObject {
	fn into_node(self, _: &WrapContext) -> Node {
		Node::Object(self)
	}
}

impl IntoNode for ReactiveArray {
	fn into_node(self, _: &WrapContext) -> Node {
		Node::Array(self)
	}
}

impl IntoNode for Unreactive {
	fn into_node(self, _: &WrapContext) -> Node {
		Node::Unreactive(self)
	}
}

macro_rules! leaf_into_node {
	($($ty:ty),*) => {
		$(
			impl IntoNode for $ty {
				fn into_node(self, _: &WrapContext) -> Node {
					Node::Value(Value::from(self))
				}
			}
		)*
	};
}

leaf_into_node!(bool, i32, i64, u32, u64, f64, &str, String);

impl Scope {
	/// Wraps plain data into a reactive tree. Leaves and already reactive
	/// nodes come back unchanged.
	pub fn reactive(&self, value: impl IntoNode) -> Node {
		value.into_node(&self.wrap_context())
	}

	pub(crate) fn wrap_context(&self) -> WrapContext {
		WrapContext {
			scope: self.downgrade(),
		}
	}
}

impl Node {
	pub fn is_reactive(&self) -> bool {
		matches!(self, Node::Object(_) | Node::Array(_))
	}

	pub fn as_object(&self) -> Option<&ReactiveObject> {
		match self {
			Node::Object(object) => Some(object),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&ReactiveArray> {
		match self {
			Node::Array(array) => Some(array),
			_ => None,
		}
	}

	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Node::Value(value) => Some(value),
			Node::Unreactive(value) => Some(value.get()),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		self.as_value().and_then(Value::as_str)
	}

	pub fn as_i64(&self) -> Option<i64> {
		self.as_value().and_then(Value::as_i64)
	}

	pub fn as_f64(&self) -> Option<f64> {
		self.as_value().and_then(Value::as_f64)
	}

	pub fn as_bool(&self) -> Option<bool> {
		self.as_value().and_then(Value::as_bool)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Node::Value(Value::Null))
	}

	/// Deep copy of the current content. Registers a dependency on every
	/// field and shape it visits.
	pub fn to_value(&self) -> Value {
		match self {
			Node::Value(value) => value.clone(),
			Node::Object(object) => object.to_value(),
			Node::Array(array) => array.to_value(),
			Node::Unreactive(value) => value.get().clone(),
		}
	}

	/// A view over the same data that never registers dependencies.
	pub fn raw(&self) -> RawNode {
		RawNode::from(self)
	}
}

/// Leaves compare by value, aggregates by identity.
impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Node::Value(a), Node::Value(b)) => a == b,
			(Node::Object(a), Node::Object(b)) => a.ptr_eq(b),
			(Node::Array(a), Node::Array(b)) => a.ptr_eq(b),
			(Node::Unreactive(a), Node::Unreactive(b)) => Rc::ptr_eq(&a.0, &b.0),
			_ => false,
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Node::Value(value) => fmt::Debug::fmt(value, f),
			Node::Object(object) => fmt::Debug::fmt(object, f),
			Node::Array(array) => fmt::Debug::fmt(array, f),
			Node::Unreactive(value) => fmt::Debug::fmt(value, f),
		}
	}
}
