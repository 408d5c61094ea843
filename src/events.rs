//! In-process publish/subscribe between page modules
//!
//! Dispatch is synchronous, in subscription order, on the caller's stack.
//! Each publish iterates a snapshot of the subscriber list, so callbacks may
//! subscribe or unsubscribe while a dispatch is in flight. A callback that
//! fails or panics is logged and skipped; the rest still run.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use serde_json::Value;

use crate::error::AppError;

/// Topic names
pub mod topics {
    pub const FOODS_UPDATED: &str = "foods-updated";
    pub const MEALS_UPDATED: &str = "meals-updated";
    pub const GOALS_UPDATED: &str = "goals-updated";
    pub const WORKOUTS_UPDATED: &str = "workouts-updated";
    pub const CUSTOM_EXERCISES_UPDATED: &str = "custom-exercises-updated";
    pub const PAGE_CHANGED: &str = "page-changed";
}

type Callback = Rc<dyn Fn(&Value) -> Result<(), AppError>>;

/// Handle returned by `subscribe`, needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    topics: RefCell<HashMap<String, Vec<(SubscriptionId, Callback)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) -> Result<(), AppError> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.topics
            .borrow_mut()
            .entry(topic.to_string())
            .or_default()
            .push((id, Rc::new(callback)));
        log::debug!("Subscribed {:?} to {}", id, topic);
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut topics = self.topics.borrow_mut();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.borrow().get(topic).map_or(0, Vec::len)
    }

    pub fn publish(&self, topic: &str, payload: &Value) -> PublishReport {
        // Snapshot and release the borrow before running callbacks
        let snapshot: Vec<(SubscriptionId, Callback)> = match self.topics.borrow().get(topic) {
            Some(subscribers) => subscribers.clone(),
            None => return PublishReport::default(),
        };

        let mut report = PublishReport::default();
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| (*callback)(payload))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    log::error!("Subscriber {:?} on {} failed: {}", id, topic, err);
                    report.failed += 1;
                }
                Err(_) => {
                    log::error!("Subscriber {:?} on {} panicked", id, topic);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
