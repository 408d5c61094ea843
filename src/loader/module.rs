//! Behavior module contract

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;
use crate::events::{EventBus, PublishReport};
use crate::persistence::DocumentStore;
use crate::platform::Shell;
use crate::router::{PageId, PageRoute};

/// A user action routed to the active page.
///
/// In the browser the name comes from `data-action` and the params from the
/// remaining `data-*` attributes, the element's value and any referenced form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAction {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl PageAction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn param(&self, key: &str) -> Result<&str, AppError> {
        self.params
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AppError::invalid_action(format!("{}: missing `{key}`", self.name)))
    }

    pub fn optional(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn parse<T: FromStr>(&self, key: &str) -> Result<T, AppError> {
        let raw = self.param(key)?;
        raw.trim().parse().map_err(|_| {
            AppError::invalid_action(format!("{}: bad `{key}` value {raw:?}", self.name))
        })
    }
}

/// What a module may touch while it runs
pub struct PageContext<'a> {
    pub page: PageId,
    pub store: &'a DocumentStore,
    pub bus: &'a EventBus,
    pub shell: &'a dyn Shell,
}

impl PageContext<'_> {
    pub fn render(&self, slot: &str, html: &str) {
        if !self.shell.render(slot, html) {
            log::debug!("{} fragment has no #{}", self.page, slot);
        }
    }

    pub fn publish(&self, topic: &str, payload: &Value) -> PublishReport {
        self.bus.publish(topic, payload)
    }
}

/// Logic paired with a page fragment.
///
/// `init` runs on the first successful activation, `reinit` on every later
/// one. Both must fully re-render and must be safe to repeat, since the
/// fragment they bind to is freshly injected each time.
pub trait PageModule {
    fn init(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError>;
    fn reinit(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError>;
    fn handle(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<(), AppError>;
}

/// Produces the behavior module for a route; may fetch catalogs first
#[async_trait(?Send)]
pub trait ModuleSource {
    async fn load(&self, route: &PageRoute) -> Result<Box<dyn PageModule>, AppError>;
}
