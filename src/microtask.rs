#![cfg(target_arch = "wasm32")]

use std::time::Duration;

use wasm_bindgen::prelude::*;

use crate::scheduler::{Scheduler, Task};

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_name = queueMicrotask)]
	fn queue_microtask(closure: &JsValue);

	#[wasm_bindgen(js_name = setTimeout)]
	fn set_timeout(closure: &JsValue, millis: i32) -> JsValue;
}

/// Schedules on the JavaScript event loop: a microtask for zero delays,
/// `setTimeout` otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
	fn schedule(&self, delay: Duration, task: Task) {
		let closure = Closure::once_into_js(move || task());
		if delay.is_zero() {
			queue_microtask(&closure);
		} else {
			let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
			let _ = set_timeout(&closure, millis);
		}
	}
}
