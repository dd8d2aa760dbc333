use std::rc::Rc;

use serde_json::Value;

use super::array::ArrayBody;
use super::object::ObjectBody;
use super::{Node, ReactiveArray, ReactiveObject, Unreactive};

/// Untracked view of a [`Node`]. Reading through it never registers a
/// dependency, at any depth.
#[derive(Clone, Debug)]
pub enum RawNode {
	Value(Value),
	Object(RawObject),
	Array(RawArray),
	Unreactive(Unreactive),
}

impl From<&Node> for RawNode {
	fn from(node: &Node) -> Self {
		match node {
			Node::Value(value) => RawNode::Value(value.clone()),
			Node::Object(object) => RawNode::Object(object.raw()),
			Node::Array(array) => RawNode::Array(array.raw()),
			Node::Unreactive(value) => RawNode::Unreactive(value.clone()),
		}
	}
}

impl RawNode {
	pub fn as_object(&self) -> Option<&RawObject> {
		match self {
			RawNode::Object(object) => Some(object),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&RawArray> {
		match self {
			RawNode::Array(array) => Some(array),
			_ => None,
		}
	}

	pub fn as_value(&self) -> Option<&Value> {
		match self {
			RawNode::Value(value) => Some(value),
			RawNode::Unreactive(value) => Some(value.get()),
			_ => None,
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			RawNode::Value(value) => value.clone(),
			RawNode::Object(object) => object.to_value(),
			RawNode::Array(array) => array.to_value(),
			RawNode::Unreactive(value) => value.get().clone(),
		}
	}
}

#[derive(Clone)]
pub struct RawObject {
	pub(super) body: Rc<ObjectBody>,
}

impl RawObject {
	pub fn get(&self, key: &str) -> Option<RawNode> {
		let fields = self.body.fields.borrow();
		let field = fields.get(key)?;
		Some(field.with_untracked(Node::raw))
	}

	pub fn keys(&self) -> Vec<String> {
		self.body.fields.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.body.fields.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn to_value(&self) -> Value {
		let fields = self.body.fields.borrow();
		Value::Object(
			fields
				.iter()
				.map(|(key, field)| (key.clone(), field.with_untracked(|node| node.raw().to_value())))
				.collect(),
		)
	}

	/// Back to the tracked view of the same record.
	pub fn reactive(&self) -> ReactiveObject {
		ReactiveObject {
			body: self.body.clone(),
		}
	}
}

impl std::fmt::Debug for RawObject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.to_value(), f)
	}
}

#[derive(Clone)]
pub struct RawArray {
	pub(super) body: Rc<ArrayBody>,
}

impl RawArray {
	pub fn get(&self, index: usize) -> Option<RawNode> {
		let items = self.body.items.borrow();
		let item = items.get(index)?;
		Some(item.with_untracked(Node::raw))
	}

	pub fn len(&self) -> usize {
		self.body.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn to_value(&self) -> Value {
		let items = self.body.items.borrow();
		Value::Array(
			items
				.iter()
				.map(|item| item.with_untracked(|node| node.raw().to_value()))
				.collect(),
		)
	}

	pub fn reactive(&self) -> ReactiveArray {
		ReactiveArray {
			body: self.body.clone(),
		}
	}
}

impl std::fmt::Debug for RawArray {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.to_value(), f)
	}
}

#[cfg(test)]
mod tests {
	use crate::scheduler::ManualScheduler;
	use crate::Scope;
	use serde_json::json;

	#[test]
	fn raw_reads_register_nothing() {
		let scheduler = ManualScheduler::new();
		let scope = Scope::new(scheduler.clone());
		let node = scope.reactive(json!({ "inner": { "x": 1 }, "list": [1, 2] }));
		let object = node.as_object().unwrap().clone();

		let snapshot = scope.derive({
			let object = object.clone();
			move |_, _| object.raw().to_value()
		});

		assert_eq!(object.field("inner").unwrap().subscriber_count(), 0);
		assert_eq!(object.shape().subscriber_count(), 0);

		object.set("extra", true);
		scheduler.tick();
		assert_eq!(snapshot.producer().unwrap().runs(), 1);

		let raw = node.raw();
		let inner = raw.as_object().unwrap().get("inner").unwrap();
		assert_eq!(inner.as_object().unwrap().get("x").unwrap().to_value(), json!(1));
		assert_eq!(raw.as_object().unwrap().get("list").unwrap().as_array().unwrap().len(), 2);
	}
}
