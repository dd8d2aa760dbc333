use std::cell::Cell;
use std::rc::Rc;

use serde_json::{json, Value};
use tether::macros::enclose;
use tether::{unreactive, Node};

use crate::scope;

fn counter() -> Rc<Cell<usize>> {
	Rc::new(Cell::new(0))
}

#[test]
fn array_snapshot_follows_items_and_length() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!([1, 2]));
	let array = data.as_array().unwrap().clone();
	let runs = counter();

	let json = scope.derive(enclose!((data, runs) move |_, _| {
		runs.set(runs.get() + 1);
		data.to_value().to_string()
	}));

	assert!(data.is_reactive());
	assert_eq!(array.len(), 2);
	assert!(!array.get(0).unwrap().is_reactive());
	assert_eq!(array.get(0).unwrap().as_i64(), Some(1));
	assert_eq!(json.read().as_deref(), Some("[1,2]"));
	assert_eq!(runs.get(), 1);

	array.set(0, 3);
	scheduler.tick();
	assert_eq!(json.read().as_deref(), Some("[3,2]"));
	assert_eq!(runs.get(), 2);

	array.push(4);
	scheduler.tick();
	assert_eq!(json.read().as_deref(), Some("[3,2,4]"));
	assert_eq!(runs.get(), 3);

	array.set(1, Value::Null);
	scheduler.tick();
	assert_eq!(json.read().as_deref(), Some("[3,null,4]"));
	assert_eq!(runs.get(), 4);
}

#[test]
fn array_length_readers() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!([]));
	let array = data.as_array().unwrap().clone();
	let runs = counter();

	let length = scope.derive(enclose!((array, runs) move |_, _| {
		runs.set(runs.get() + 1);
		array.len()
	}));

	array.push(false);
	scheduler.tick();
	assert_eq!(length.read(), Some(1));

	array.push(false);
	scheduler.tick();
	assert_eq!(length.read(), Some(2));

	array.pop();
	scheduler.tick();
	assert_eq!(length.read(), Some(1));

	array.pop();
	scheduler.tick();
	assert_eq!(length.read(), Some(0));
	assert_eq!(runs.get(), 5);
}

#[test]
fn raw_snapshots_do_not_subscribe() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!([1, 2, 3]));
	let array = data.as_array().unwrap().clone();
	let runs = counter();

	let _json = scope.derive(enclose!((data, runs) move |_, _| {
		runs.set(runs.get() + 1);
		data.raw().to_value().to_string()
	}));

	array.push(4);
	array.push(5);
	scheduler.tick();

	assert_eq!(runs.get(), 1);
	assert_eq!(data.raw().as_array().unwrap().len(), 5);
}

#[test]
fn derivations_over_nested_records() {
	let (scope, scheduler) = scope();
	let base = scope.reactive(json!({
		"a": 1,
		"b": 2,
		"c": null,
		"ob": { "a": "a1", "b": "b1" },
		"ar": [11, 22],
	}));
	let base = base.as_object().unwrap().clone();

	assert_eq!(base.keys(), ["a", "b", "c", "ob", "ar"]);
	assert!(base.get("c").unwrap().is_null());

	let a = scope.derive(enclose!((base) move |_, _| base.get("a").and_then(|n| n.as_i64()).unwrap_or(0) * 10));
	let c = scope.derive(enclose!((base) move |_, _| base.get("c").map(|n| n.to_value().to_string())));
	let ob = scope.derive(enclose!((base) move |_, _| {
		let ob = base.get("ob").unwrap();
		let ob = ob.as_object().unwrap();
		format!(
			"{} {}",
			ob.get("a").unwrap().as_str().unwrap_or_default(),
			ob.get("b").unwrap().as_str().unwrap_or_default()
		)
	}));
	let ar = scope.derive(enclose!((base) move |_, _| {
		let ar = base.get("ar").unwrap();
		let ar = ar.as_array().unwrap();
		let sum: i64 = ar.iter_values().filter_map(|n| n.as_i64()).sum();
		(ar.len(), sum)
	}));

	assert_eq!(a.read(), Some(10));
	assert_eq!(c.read(), Some(Some(String::from("null"))));
	assert_eq!(ob.read().as_deref(), Some("a1 b1"));
	assert_eq!(ar.read(), Some((2, 33)));

	let nested = base.get("ob").unwrap();
	base.set("a", 5);
	base.set("c", true);
	nested.as_object().unwrap().set("a", "a2");
	nested.as_object().unwrap().set("b", "b2");
	base.get("ar").unwrap().as_array().unwrap().set(2, 33);
	scheduler.tick();

	assert_eq!(a.read(), Some(50));
	assert_eq!(c.read(), Some(Some(String::from("true"))));
	assert_eq!(ob.read().as_deref(), Some("a2 b2"));
	assert_eq!(ar.read(), Some((3, 66)));

	base.set("ob", json!({ "a": "a3", "b": "b3" }));
	base.set("ar", json!([10, -10]));
	scheduler.tick();

	assert_eq!(ob.read().as_deref(), Some("a3 b3"));
	assert_eq!(ar.read(), Some((2, 0)));
	assert_eq!(nested.to_value(), json!({ "a": "a2", "b": "b2" }));
}

#[test]
fn removed_fields_can_come_back() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!({ "a": 1, "b": 2 }));
	let data = data.as_object().unwrap().clone();

	let a = scope.derive(enclose!((data) move |_, _| data.get("a").and_then(|n| n.as_i64())));

	data.remove("a");
	assert!(data.get("a").is_none());
	assert_eq!(data.to_value(), json!({ "b": 2 }));
	assert_eq!(data.keys(), ["b"]);
	scheduler.tick();
	assert_eq!(a.read(), Some(None));

	data.set("a", 2);
	data.set("a", 3);
	scheduler.tick();
	assert_eq!(a.read(), Some(Some(3)));

	data.remove("b");
	assert_eq!(data.to_value(), json!({ "a": 3 }));
}

#[test]
fn key_readers_ignore_field_writes() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!({ "a": 1 }));
	let data = data.as_object().unwrap().clone();
	let runs = counter();

	let keys = scope.derive(enclose!((data, runs) move |_, _| {
		runs.set(runs.get() + 1);
		data.keys()
	}));

	data.set("a", 2);
	scheduler.tick();
	assert_eq!(runs.get(), 1);

	data.set("b", 1);
	scheduler.tick();
	assert_eq!(runs.get(), 2);
	assert_eq!(keys.read(), Some(vec![String::from("a"), String::from("b")]));
}

#[test]
fn unreactive_values_are_replaced_whole() {
	let (scope, scheduler) = scope();
	let data = scope.reactive(json!({}));
	let data = data.as_object().unwrap().clone();
	data.set("config", unreactive(json!({ "depth": 1 })));

	let depth = scope.derive(enclose!((data) move |_, _| {
		data.get("config")
			.and_then(|n| n.as_value().and_then(|v| v["depth"].as_i64()))
	}));
	assert_eq!(depth.read(), Some(Some(1)));
	assert!(!data.get("config").unwrap().is_reactive());

	data.set("config", unreactive(json!({ "depth": 2 })));
	scheduler.tick();
	assert_eq!(depth.read(), Some(Some(2)));
}

#[test]
fn reactive_values_are_stored_as_is() {
	let (scope, _) = scope();
	let inner = scope.reactive(json!({ "x": 1 }));
	let outer = scope.reactive(json!({}));
	let outer = outer.as_object().unwrap();

	outer.set("inner", inner.clone());
	let stored: Node = outer.get("inner").unwrap();
	assert!(stored == inner);
}

#[test]
fn keys_keep_insertion_order() {
	let (scope, _) = scope();
	let data = scope.reactive(json!({ "zeta": 1, "alpha": 2, "mid": 3 }));
	let data = data.as_object().unwrap().clone();

	data.set("beta", 4);
	assert_eq!(data.keys(), ["zeta", "alpha", "mid", "beta"]);

	let keys: Vec<_> = data
		.to_value()
		.as_object()
		.unwrap()
		.keys()
		.cloned()
		.collect();
	assert_eq!(keys, ["zeta", "alpha", "mid", "beta"]);

	let raw = data.raw().to_value();
	let raw_keys: Vec<_> = raw.as_object().unwrap().keys().cloned().collect();
	assert_eq!(raw_keys, ["zeta", "alpha", "mid", "beta"]);
}
