//! Console logging on top of [`tracing`].

mod logger;
mod subscriber;

pub use logger::Logger;
pub use subscriber::{STAGE_TARGET, init_subscriber};

/// Event capture for logging assertions in unit tests.
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_helpers {
    use std::sync::{Arc, Mutex};

    /// Records `(target, level)` for every event.
    #[derive(Clone, Default)]
    pub struct Recorder(Arc<Mutex<Vec<(String, tracing::Level)>>>);

    impl Recorder {
        /// Events seen so far, in order.
        pub fn events(&self) -> Vec<(String, tracing::Level)> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Recorder {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let meta = event.metadata();
            self.0
                .lock()
                .unwrap()
                .push((meta.target().to_string(), *meta.level()));
        }
    }
}
