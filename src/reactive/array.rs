use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::{IntoNode, Node, RawArray, WrapContext};
use crate::TrackedValue;

/// An ordered sequence with one tracked value per index and the length as
/// its shape.
///
/// Cells belong to positions, not to elements: shifting operations rewrite
/// every position they move, so a reader of index `i` re-runs when whatever
/// sits at `i` changes.
#[derive(Clone)]
pub struct ReactiveArray {
	pub(super) body: Rc<ArrayBody>,
}

pub(super) struct ArrayBody {
	pub(super) cx: WrapContext,
	pub(super) items: RefCell<Vec<TrackedValue<Node>>>,
	pub(super) shape: TrackedValue<u64>,
}

impl ReactiveArray {
	pub(super) fn from_vec(cx: &WrapContext, items: Vec<Value>) -> Self {
		let items = items
			.into_iter()
			.map(|value| cx.cell(cx.wrap(value)))
			.collect();

		ReactiveArray {
			body: Rc::new(ArrayBody {
				cx: cx.clone(),
				items: RefCell::new(items),
				shape: cx.shape(),
			}),
		}
	}

	fn item_untracked(&self, index: usize) -> Option<TrackedValue<Node>> {
		self.body.items.borrow().get(index).cloned()
	}

	fn len_untracked(&self) -> usize {
		self.body.items.borrow().len()
	}

	/// Reads one position. Out of range reads depend on the length.
	pub fn get(&self, index: usize) -> Option<Node> {
		match self.item_untracked(index) {
			Some(item) => Some(item.read()),
			None => {
				self.body.shape.read();
				None
			}
		}
	}

	/// Writes one position. Writing past the end fills the gap with `null`
	/// and changes the length.
	pub fn set(&self, index: usize, value: impl IntoNode) {
		let node = value.into_node(&self.body.cx);

		if let Some(item) = self.item_untracked(index) {
			item.write(node);
			return;
		}

		{
			let mut items = self.body.items.borrow_mut();
			while items.len() < index {
				items.push(self.body.cx.cell(Node::Value(Value::Null)));
			}
			items.push(self.body.cx.cell(node));
		}
		self.bump();
	}

	pub fn push(&self, value: impl IntoNode) {
		let node = value.into_node(&self.body.cx);
		self.body.items.borrow_mut().push(self.body.cx.cell(node));
		self.bump();
	}

	pub fn pop(&self) -> Option<Node> {
		let item = self.body.items.borrow_mut().pop()?;
		let value = release(&item);
		self.bump();
		Some(value)
	}

	/// Inserts at `index`, shifting every later position. Returns `false`
	/// and leaves the array alone when `index > len`.
	pub fn insert(&self, index: usize, value: impl IntoNode) -> bool {
		let len = self.len_untracked();
		if index > len {
			return false;
		}

		let node = value.into_node(&self.body.cx);
		if index == len {
			self.push(node);
			return true;
		}

		let items = self.body.items.borrow().clone();
		let last = items[len - 1].read_untracked();
		self.body.items.borrow_mut().push(self.body.cx.cell(last));

		for position in (index + 1..len).rev() {
			items[position].write(items[position - 1].read_untracked());
		}
		items[index].write(node);
		self.bump();
		true
	}

	/// Removes `index`, shifting every later position back.
	pub fn remove(&self, index: usize) -> Option<Node> {
		let items = self.body.items.borrow().clone();
		let removed = items.get(index)?.read_untracked();

		for position in index..items.len() - 1 {
			items[position].write(items[position + 1].read_untracked());
		}
		if let Some(last) = self.body.items.borrow_mut().pop() {
			release(&last);
		}
		self.bump();
		Some(removed)
	}

	pub fn truncate(&self, len: usize) {
		if len >= self.len_untracked() {
			return;
		}
		let dropped = self.body.items.borrow_mut().split_off(len);
		for item in &dropped {
			release(item);
		}
		self.bump();
	}

	pub fn clear(&self) {
		self.truncate(0);
	}

	pub fn len(&self) -> usize {
		self.body.shape.read();
		self.len_untracked()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Every element. Depends on the length and on each position.
	pub fn iter_values(&self) -> std::vec::IntoIter<Node> {
		self.body.shape.read();
		let items = self.body.items.borrow().clone();
		items.iter().map(TrackedValue::read).collect::<Vec<_>>().into_iter()
	}

	/// The cell behind one position, without registering anything.
	pub fn item(&self, index: usize) -> Option<TrackedValue<Node>> {
		self.item_untracked(index)
	}

	/// The value standing for the length.
	pub fn shape(&self) -> TrackedValue<u64> {
		self.body.shape.clone()
	}

	pub fn to_value(&self) -> Value {
		Value::Array(self.iter_values().map(|node| node.to_value()).collect())
	}

	pub fn raw(&self) -> RawArray {
		RawArray {
			body: self.body.clone(),
		}
	}

	pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	fn bump(&self) {
		self.body.shape.update(|shape| *shape = shape.wrapping_add(1));
	}
}

/// Clears a cell that left the array so that its readers re-run.
fn release(item: &TrackedValue<Node>) -> Node {
	item.replace(Node::Value(Value::Null))
}

impl fmt::Debug for ReactiveArray {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.raw().to_value(), f)
	}
}
