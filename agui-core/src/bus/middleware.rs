use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use agui_sdk::objects::EventRecord;
use tracing::{debug, error};

use crate::utils::sync::{read, write};

/// A transform or filter step applied to every processed event.
///
/// Returning `None` drops the event: later steps do not run, it is not
/// recorded in history and no subscriber sees it. Dropping is not an error.
///
/// Any `Fn(EventRecord) -> Option<EventRecord>` closure is a middleware.
pub trait Middleware: Send + Sync + 'static {
    fn process(&self, record: EventRecord) -> Option<EventRecord>;
}

impl<F> Middleware for F
where
    F: Fn(EventRecord) -> Option<EventRecord> + Send + Sync + 'static,
{
    fn process(&self, record: EventRecord) -> Option<EventRecord> {
        self(record)
    }
}

/// Middleware steps in registration order.
#[derive(Default)]
pub(crate) struct MiddlewareChain {
    steps: RwLock<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn push(&self, middleware: impl Middleware) {
        write(&self.steps).push(Arc::new(middleware));
    }

    pub fn clear(&self) {
        write(&self.steps).clear();
    }

    /// Run every step. A panicking step drops the event.
    pub fn apply(&self, record: EventRecord) -> Option<EventRecord> {
        let steps = read(&self.steps).clone();
        let mut record = record;
        for (index, step) in steps.iter().enumerate() {
            let kind = record.kind();
            match catch_unwind(AssertUnwindSafe(|| step.process(record))) {
                Ok(Some(next)) => record = next,
                Ok(None) => {
                    debug!(%kind, step = index, "Event dropped by middleware");
                    return None;
                }
                Err(_) => {
                    error!(%kind, step = index, "Middleware panicked, dropping event");
                    return None;
                }
            }
        }
        Some(record)
    }
}
