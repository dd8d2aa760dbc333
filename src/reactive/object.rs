use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{IntoNode, Node, RawObject, WrapContext};
use crate::TrackedValue;

/// A string-keyed record whose every field is a tracked value.
///
/// Keys keep insertion order. Cloning the handle shares the record.
#[derive(Clone)]
pub struct ReactiveObject {
	pub(super) body: Rc<ObjectBody>,
}

pub(super) struct ObjectBody {
	pub(super) cx: WrapContext,
	pub(super) fields: RefCell<IndexMap<String, TrackedValue<Node>>>,
	pub(super) shape: TrackedValue<u64>,
}

impl ReactiveObject {
	pub(super) fn from_map(cx: &WrapContext, map: Map<String, Value>) -> Self {
		let fields = map
			.into_iter()
			.map(|(key, value)| (key, cx.cell(cx.wrap(value))))
			.collect();

		ReactiveObject {
			body: Rc::new(ObjectBody {
				cx: cx.clone(),
				fields: RefCell::new(fields),
				shape: cx.shape(),
			}),
		}
	}

	fn field_untracked(&self, key: &str) -> Option<TrackedValue<Node>> {
		self.body.fields.borrow().get(key).cloned()
	}

	/// Reads one field. A missing key depends on the key set, so adding it
	/// later re-runs the reader.
	pub fn get(&self, key: &str) -> Option<Node> {
		match self.field_untracked(key) {
			Some(field) => Some(field.read()),
			None => {
				self.body.shape.read();
				None
			}
		}
	}

	/// Writes one field. Returns `true` when the key was new, which also
	/// changes the shape.
	pub fn set(&self, key: impl Into<String>, value: impl IntoNode) -> bool {
		let key = key.into();
		let node = value.into_node(&self.body.cx);

		if let Some(field) = self.field_untracked(&key) {
			field.write(node);
			return false;
		}

		let field = self.body.cx.cell(node);
		self.body.fields.borrow_mut().insert(key, field);
		self.bump();
		true
	}

	/// Removes one field, changing the shape if it existed. Readers of the
	/// field see it cleared to `null` and re-run.
	pub fn remove(&self, key: &str) -> Option<Node> {
		let removed = self.body.fields.borrow_mut().shift_remove(key)?;
		let value = removed.replace(Node::Value(Value::Null));
		self.bump();
		Some(value)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.body.shape.read();
		self.body.fields.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<String> {
		self.body.shape.read();
		self.body.fields.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.body.shape.read();
		self.body.fields.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Every field with its value. Depends on the shape and on each field.
	pub fn entries(&self) -> Vec<(String, Node)> {
		self.body.shape.read();
		let fields: Vec<_> = self
			.body
			.fields
			.borrow()
			.iter()
			.map(|(key, field)| (key.clone(), field.clone()))
			.collect();

		fields
			.into_iter()
			.map(|(key, field)| (key, field.read()))
			.collect()
	}

	/// The cell behind one field, without registering anything.
	pub fn field(&self, key: &str) -> Option<TrackedValue<Node>> {
		self.field_untracked(key)
	}

	/// The value standing for the key set. It changes whenever a key is
	/// added or removed.
	pub fn shape(&self) -> TrackedValue<u64> {
		self.body.shape.clone()
	}

	pub fn to_value(&self) -> Value {
		Value::Object(
			self.entries()
				.into_iter()
				.map(|(key, node)| (key, node.to_value()))
				.collect(),
		)
	}

	pub fn raw(&self) -> RawObject {
		RawObject {
			body: self.body.clone(),
		}
	}

	pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	fn bump(&self) {
		self.body.shape.update(|shape| *shape = shape.wrapping_add(1));
	}
}

impl fmt::Debug for ReactiveObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.raw().to_value(), f)
	}
}

#[cfg(test)]
mod tests {
	use crate::scheduler::ManualScheduler;
	use crate::Scope;
	use serde_json::json;
	use std::cell::Cell;
	use std::rc::Rc;

	#[test]
	fn field_reads_ignore_other_fields() {
		let scheduler = ManualScheduler::new();
		let scope = Scope::new(scheduler.clone());
		let node = scope.reactive(json!({ "a": 1, "b": 2 }));
		let object = node.as_object().unwrap().clone();

		let runs = Rc::new(Cell::new(0));
		let a = scope.derive({
			let object = object.clone();
			let runs = runs.clone();
			move |_, _| {
				runs.set(runs.get() + 1);
				object.get("a").and_then(|n| n.as_i64())
			}
		});

		object.set("b", 3);
		scheduler.tick();
		assert_eq!(runs.get(), 1);

		object.set("a", 5);
		scheduler.tick();
		assert_eq!(runs.get(), 2);
		assert_eq!(a.read(), Some(Some(5)));
	}

	#[test]
	fn missing_key_reads_follow_the_shape() {
		let scheduler = ManualScheduler::new();
		let scope = Scope::new(scheduler.clone());
		let node = scope.reactive(json!({}));
		let object = node.as_object().unwrap().clone();

		let name = scope.derive({
			let object = object.clone();
			move |_, _| object.get("name").map(|n| n.to_value())
		});
		assert_eq!(name.read(), Some(None));

		assert!(object.set("name", "x"));
		scheduler.tick();
		assert_eq!(name.read(), Some(Some(json!("x"))));
	}

	#[test]
	fn overwriting_a_field_keeps_the_shape() {
		let scope = Scope::new(ManualScheduler::new());
		let node = scope.reactive(json!({ "a": 1 }));
		let object = node.as_object().unwrap();
		let shape = object.shape().read_untracked();

		assert!(!object.set("a", 2));
		assert_eq!(object.shape().read_untracked(), shape);

		assert!(object.remove("a").is_some());
		assert_ne!(object.shape().read_untracked(), shape);
		assert!(object.remove("a").is_none());
	}

	#[test]
	fn nested_plain_values_are_wrapped_on_set() {
		let scope = Scope::new(ManualScheduler::new());
		let node = scope.reactive(json!({}));
		let object = node.as_object().unwrap();

		object.set("inner", json!({ "x": [1] }));
		let inner = object.get("inner").unwrap();
		assert!(inner.is_reactive());
		assert_eq!(object.to_value(), json!({ "inner": { "x": [1] } }));
	}
}
