//! Page lifecycle controller
//!
//! States: `Idle -> Loading(p) -> Active(p) | Error`. Each navigation takes a
//! new sequence number; after every await the navigation checks that it is
//! still the newest one and drops its result otherwise, so a slow response
//! can never overwrite a newer page.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use serde_json::json;

use super::module::{ModuleSource, PageAction, PageContext, PageModule};
use crate::error::AppError;
use crate::events::{EventBus, SubscriptionId, topics};
use crate::persistence::DocumentStore;
use crate::platform::{FragmentSource, Shell};
use crate::router::{ModuleRegistry, PageId, PageRoute, Router};

type ModuleHandle = Rc<RefCell<Box<dyn PageModule>>>;
type SharedLoad = Shared<LocalBoxFuture<'static, Result<ModuleHandle, AppError>>>;

/// Shell action that only switches pages
pub const NAVIGATE_ACTION: &str = "navigate";

/// Pages refreshed in place when a topic is published while they are active
pub const REFRESH_RULES: &[(&str, &[PageId])] = &[
    (topics::FOODS_UPDATED, &[PageId::Nutrition, PageId::Foods]),
    (topics::MEALS_UPDATED, &[PageId::Nutrition]),
    (topics::GOALS_UPDATED, &[PageId::Goals, PageId::GoalsManager]),
    (
        topics::CUSTOM_EXERCISES_UPDATED,
        &[PageId::Fitness, PageId::FitnessTable],
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub enum LoaderState {
    Idle,
    Loading(PageId),
    Active(PageId),
    Error { requested: String, cause: AppError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Module fetched (or reused after an abandoned load) and `init` ran
    Loaded(PageId),
    /// Module already initialized; `reinit` ran on the fresh fragment
    Reinitialized(PageId),
    /// Target is already the active page; nothing fetched
    Unchanged(PageId),
    /// A navigation to the same target is already in flight
    AlreadyLoading(PageId),
    /// A newer navigation started before this one finished
    Superseded(PageId),
}

struct LoaderInner {
    router: Router,
    store: Rc<DocumentStore>,
    bus: Rc<EventBus>,
    shell: Rc<dyn Shell>,
    fragments: Rc<dyn FragmentSource>,
    modules: Rc<dyn ModuleSource>,

    state: RefCell<LoaderState>,
    /// Last successfully activated page
    current: Cell<Option<PageId>>,
    sequence: Cell<u64>,
    registry: RefCell<ModuleRegistry<ModuleHandle>>,
    pending_loads: RefCell<HashMap<PageId, SharedLoad>>,
    refresh_requested: Cell<bool>,
    subscriptions: RefCell<Vec<(&'static str, SubscriptionId)>>,
}

impl Drop for LoaderInner {
    fn drop(&mut self) {
        for (topic, id) in self.subscriptions.borrow_mut().drain(..) {
            self.bus.unsubscribe(topic, id);
        }
    }
}

/// Cheap to clone; clones share one controller
#[derive(Clone)]
pub struct PageLoader {
    inner: Rc<LoaderInner>,
}

impl PageLoader {
    pub fn new(
        router: Router,
        store: Rc<DocumentStore>,
        bus: Rc<EventBus>,
        shell: Rc<dyn Shell>,
        fragments: Rc<dyn FragmentSource>,
        modules: Rc<dyn ModuleSource>,
    ) -> Self {
        let inner = Rc::new(LoaderInner {
            router,
            store,
            bus,
            shell,
            fragments,
            modules,
            state: RefCell::new(LoaderState::Idle),
            current: Cell::new(None),
            sequence: Cell::new(0),
            registry: RefCell::new(ModuleRegistry::new()),
            pending_loads: RefCell::new(HashMap::new()),
            refresh_requested: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
        });

        for &(topic, pages) in REFRESH_RULES {
            let weak = Rc::downgrade(&inner);
            let id = inner.bus.subscribe(topic, move |_| {
                if let Some(inner) = weak.upgrade() {
                    let wants_refresh = matches!(
                        *inner.state.borrow(),
                        LoaderState::Active(page) if pages.contains(&page)
                    );
                    if wants_refresh {
                        inner.refresh_requested.set(true);
                    }
                }
                Ok(())
            });
            inner.subscriptions.borrow_mut().push((topic, id));
        }

        Self { inner }
    }

    pub fn state(&self) -> LoaderState {
        self.inner.state.borrow().clone()
    }

    pub fn current_page(&self) -> Option<PageId> {
        self.inner.current.get()
    }

    pub fn is_loaded(&self, page: PageId) -> bool {
        self.inner.registry.borrow().is_loaded(page)
    }

    pub fn is_initialized(&self, page: PageId) -> bool {
        self.inner.registry.borrow().is_initialized(page)
    }

    pub fn store(&self) -> &Rc<DocumentStore> {
        &self.inner.store
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.inner.bus
    }

    pub async fn navigate_to(&self, page: PageId) -> Result<NavigationOutcome, AppError> {
        self.navigate(page.as_str()).await
    }

    /// Show `target`, superseding any navigation still in flight
    pub async fn navigate(&self, target: &str) -> Result<NavigationOutcome, AppError> {
        match *self.inner.state.borrow() {
            LoaderState::Active(page) if page.as_str() == target => {
                log::debug!("Already on {page}");
                return Ok(NavigationOutcome::Unchanged(page));
            }
            LoaderState::Loading(page) if page.as_str() == target => {
                return Ok(NavigationOutcome::AlreadyLoading(page));
            }
            _ => {}
        }

        let seq = self.inner.sequence.get() + 1;
        self.inner.sequence.set(seq);

        let result = match self.inner.router.resolve(target) {
            Ok(route) => self.run(seq, route).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                log::error!("Error loading page {target}: {err}");
                self.inner.shell.show_error(&err.user_message(target));
                self.inner.state.replace(LoaderState::Error {
                    requested: target.to_string(),
                    cause: err.clone(),
                });
                Err(err)
            }
        }
    }

    fn is_current(&self, seq: u64) -> bool {
        self.inner.sequence.get() == seq
    }

    async fn run(&self, seq: u64, route: PageRoute) -> Result<NavigationOutcome, AppError> {
        let inner = &self.inner;
        let page = route.page;

        inner.state.replace(LoaderState::Loading(page));
        inner.shell.show_loading();

        let html = match inner.fragments.fetch_text(&route.fragment_path).await {
            _ if !self.is_current(seq) => return Ok(NavigationOutcome::Superseded(page)),
            Ok(html) => html,
            Err(err) => return Err(err),
        };
        inner.shell.inject(&html);

        let existing = inner.registry.borrow().get(page);
        let module = match existing {
            Some(module) => module,
            None => {
                let loaded = self.load_module(&route).await;
                inner.pending_loads.borrow_mut().remove(&page);
                // Keep a module even if this navigation lost the race, so the
                // next visit reuses it instead of loading again
                let loaded = loaded.map(|m| inner.registry.borrow_mut().register(page, m));
                match loaded {
                    _ if !self.is_current(seq) => return Ok(NavigationOutcome::Superseded(page)),
                    Ok(module) => module,
                    Err(err) => return Err(err),
                }
            }
        };

        let first_time = !inner.registry.borrow().is_initialized(page);
        let ctx = self.context(page);
        let result = if first_time {
            log::info!("Running {}", page.init_symbol());
            module.borrow_mut().init(&ctx)
        } else {
            module.borrow_mut().reinit(&ctx)
        };
        result.map_err(|err| match err {
            AppError::ModuleInitFailure { .. } => err,
            other => AppError::init(page, other),
        })?;

        if first_time {
            inner.registry.borrow_mut().mark_initialized(page);
        }
        inner.refresh_requested.set(false);
        inner.current.set(Some(page));
        inner.state.replace(LoaderState::Active(page));
        inner.shell.set_active_nav(page);
        inner.bus.publish(topics::PAGE_CHANGED, &json!(page.as_str()));
        log::info!("Page {page} active");

        Ok(if first_time {
            NavigationOutcome::Loaded(page)
        } else {
            NavigationOutcome::Reinitialized(page)
        })
    }

    /// One shared load per page, however many navigations wait on it
    fn load_module(&self, route: &PageRoute) -> SharedLoad {
        let mut pending = self.inner.pending_loads.borrow_mut();
        pending
            .entry(route.page)
            .or_insert_with(|| {
                log::info!("Loading module {}", route.module_path);
                let source = Rc::clone(&self.inner.modules);
                let route = route.clone();
                async move {
                    source
                        .load(&route)
                        .await
                        .map(|module| Rc::new(RefCell::new(module)))
                }
                .boxed_local()
                .shared()
            })
            .clone()
    }

    fn context(&self, page: PageId) -> PageContext<'_> {
        PageContext {
            page,
            store: &self.inner.store,
            bus: &self.inner.bus,
            shell: self.inner.shell.as_ref(),
        }
    }

    fn active_module(&self) -> Option<(PageId, ModuleHandle)> {
        let LoaderState::Active(page) = *self.inner.state.borrow() else {
            return None;
        };
        let module = self.inner.registry.borrow().get(page)?;
        Some((page, module))
    }

    /// Route a user action to the active page.
    ///
    /// Returns `Ok(false)` when no page is active.
    pub fn dispatch(&self, action: &PageAction) -> Result<bool, AppError> {
        let Some((page, module)) = self.active_module() else {
            log::debug!("Ignoring {} (no active page)", action.name);
            return Ok(false);
        };

        log::debug!("{page}: {}", action.name);
        let ctx = self.context(page);
        let result = module.borrow_mut().handle(action, &ctx);
        self.flush_refresh()?;
        result.map(|()| true)
    }

    /// Handle an action raised by the shell and return the page it asks to
    /// show next.
    ///
    /// A `navigate` action only names its target. Any other action goes to
    /// the active module first; its `navigate` param is followed only if the
    /// module accepted it.
    pub fn route_action(&self, action: &PageAction) -> Result<Option<String>, AppError> {
        if action.name != NAVIGATE_ACTION {
            self.dispatch(action)?;
        }
        Ok(action.optional("navigate").map(str::to_string))
    }

    /// Run a refresh requested by an event published since the last flush
    pub fn flush_refresh(&self) -> Result<(), AppError> {
        if !self.inner.refresh_requested.replace(false) {
            return Ok(());
        }
        self.refresh_current()
    }

    /// Re-render the active page in place
    pub fn refresh_current(&self) -> Result<(), AppError> {
        let Some((page, module)) = self.active_module() else {
            return Ok(());
        };
        log::debug!("Refreshing {page}");
        let ctx = self.context(page);
        let result = module.borrow_mut().reinit(&ctx);
        // A refresh does not trigger another refresh
        self.inner.refresh_requested.set(false);
        result
    }
}
