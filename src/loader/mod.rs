//! Page loading
//!
//! [`PageLoader`] owns navigation: it fetches a page's fragment, injects it
//! into the shell, loads the page's [`PageModule`] at most once and runs its
//! init or reinit hook.

mod controller;
mod module;

pub use controller::{LoaderState, NAVIGATE_ACTION, NavigationOutcome, PageLoader, REFRESH_RULES};
pub use module::{ModuleSource, PageAction, PageContext, PageModule};

#[cfg(test)]
pub(crate) mod test_support {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use async_trait::async_trait;
    use futures::channel::oneshot;
    use serde_json::json;

    use super::{ModuleSource, PageAction, PageContext, PageModule};
    use crate::error::AppError;
    use crate::platform::FragmentSource;
    use crate::router::{PageId, PageRoute};

    type Reply = Result<String, AppError>;

    /// Fragment source whose responses can be held back per path
    #[derive(Default)]
    pub struct GatedSource {
        gates: RefCell<HashMap<String, oneshot::Receiver<Reply>>>,
        fetches: Cell<usize>,
    }

    impl GatedSource {
        /// The next fetch of `path` waits for the returned sender
        pub fn gate(&self, path: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(path.to_string(), rx);
            tx
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.get()
        }
    }

    #[async_trait(?Send)]
    impl FragmentSource for GatedSource {
        async fn fetch_text(&self, path: &str) -> Result<String, AppError> {
            self.fetches.set(self.fetches.get() + 1);
            let gate = self.gates.borrow_mut().remove(path);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(AppError::fetch(path, "cancelled"))),
                None => Ok(format!("<section>{path}</section>")),
            }
        }
    }

    #[derive(Default)]
    pub struct Counters {
        pub inits: Cell<usize>,
        pub reinits: Cell<usize>,
        pub actions: RefCell<Vec<String>>,
        pub fail_init: Cell<bool>,
    }

    struct StubModule {
        counters: Rc<Counters>,
    }

    impl PageModule for StubModule {
        fn init(&mut self, _ctx: &PageContext<'_>) -> Result<(), AppError> {
            self.counters.inits.set(self.counters.inits.get() + 1);
            if self.counters.fail_init.get() {
                return Err(AppError::Storage("stub init failure".into()));
            }
            Ok(())
        }

        fn reinit(&mut self, _ctx: &PageContext<'_>) -> Result<(), AppError> {
            self.counters.reinits.set(self.counters.reinits.get() + 1);
            Ok(())
        }

        fn handle(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<(), AppError> {
            self.counters.actions.borrow_mut().push(action.name.clone());
            if action.name == "publish" {
                ctx.publish(action.param("topic")?, &json!({}));
            }
            Ok(())
        }
    }

    /// Module source handing out counting stubs
    #[derive(Default)]
    pub struct StubModules {
        counters: RefCell<HashMap<PageId, Rc<Counters>>>,
        loads: RefCell<HashMap<PageId, usize>>,
        failing: RefCell<HashMap<PageId, bool>>,
        gates: RefCell<HashMap<PageId, oneshot::Receiver<()>>>,
    }

    impl StubModules {
        pub fn counters(&self, page: PageId) -> Rc<Counters> {
            self.counters.borrow_mut().entry(page).or_default().clone()
        }

        pub fn load_count(&self, page: PageId) -> usize {
            self.loads.borrow().get(&page).copied().unwrap_or(0)
        }

        pub fn fail_load(&self, page: PageId, fail: bool) {
            self.failing.borrow_mut().insert(page, fail);
        }

        /// The next load of `page` waits for the returned sender
        pub fn gate(&self, page: PageId) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().insert(page, rx);
            tx
        }
    }

    #[async_trait(?Send)]
    impl ModuleSource for StubModules {
        async fn load(&self, route: &PageRoute) -> Result<Box<dyn PageModule>, AppError> {
            let page = route.page;
            *self.loads.borrow_mut().entry(page).or_default() += 1;
            let gate = self.gates.borrow_mut().remove(&page);
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            if self.failing.borrow().get(&page).copied().unwrap_or(false) {
                return Err(AppError::fetch(&route.module_path, "404 Not Found"));
            }
            Ok(Box::new(StubModule {
                counters: self.counters(page),
            }))
        }
    }
}
