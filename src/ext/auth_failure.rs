//! Hook invoked when the session cannot be restored.

// self
use crate::_prelude::*;

/// Notified once per failed refresh, after the local session has been cleared.
///
/// The pipeline never navigates or renders anything itself; implementers decide whether
/// to route to a login surface, show a toast, or do nothing.
pub trait AuthFailureHandler
where
	Self: Send + Sync,
{
	/// Called with no arguments when a refresh fails.
	fn on_auth_failure(&self);
}
impl<F> AuthFailureHandler for F
where
	F: Fn() + Send + Sync,
{
	fn on_auth_failure(&self) {
		self()
	}
}

/// Handler that ignores auth failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuthFailureHandler;
impl AuthFailureHandler for NoopAuthFailureHandler {
	fn on_auth_failure(&self) {}
}

/// Shared handle to an [`AuthFailureHandler`].
pub type SharedAuthFailureHandler = Arc<dyn AuthFailureHandler>;

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[test]
	fn closures_are_handlers() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let handler: SharedAuthFailureHandler = Arc::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		handler.on_auth_failure();
		NoopAuthFailureHandler.on_auth_failure();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
