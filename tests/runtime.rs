use std::time::Duration;

use tether::{LocalScheduler, Scope};

#[tokio::test(flavor = "current_thread")]
async fn flushes_on_the_local_set() {
	crate::init_tracing();
	let local = tokio::task::LocalSet::new();

	local
		.run_until(async {
			let scope = Scope::new(LocalScheduler);
			let a = scope.state(1);
			let double = scope.derive({
				let a = a.clone();
				move |_, _| a.read() * 2
			});

			a.write(4);
			assert_eq!(double.read(), Some(2));

			tokio::time::sleep(Duration::from_millis(5)).await;
			assert_eq!(double.read(), Some(8));
		})
		.await;
}
