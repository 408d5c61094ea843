//! Text sources for page fragments and catalogs

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;

#[async_trait(?Send)]
pub trait FragmentSource {
    /// Fetch a text payload by relative path
    async fn fetch_text(&self, path: &str) -> Result<String, AppError>;
}

/// Fixed path → body table, used natively and in tests
#[derive(Debug, Default)]
pub struct StaticSource {
    bodies: RefCell<HashMap<String, String>>,
    fetches: Cell<usize>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, body: &str) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: &str, body: &str) {
        self.bodies
            .borrow_mut()
            .insert(path.to_string(), body.to_string());
    }

    /// Number of fetch attempts so far, including misses
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl FragmentSource for StaticSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AppError> {
        self.fetches.set(self.fetches.get() + 1);
        self.bodies
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| AppError::fetch(path, "404 Not Found"))
    }
}

/// Same-origin HTTP fetch via `window.fetch`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct HttpSource;

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl FragmentSource for HttpSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AppError> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;
        use web_sys::{Request, RequestInit, RequestMode, Response};

        let js_err = |e: wasm_bindgen::JsValue| AppError::fetch(path, format!("{e:?}"));

        let window = web_sys::window().ok_or_else(|| AppError::fetch(path, "no window"))?;

        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::SameOrigin);
        let request = Request::new_with_str_and_init(path, &opts).map_err(js_err)?;

        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(js_err)?;

        if !response.ok() {
            return Err(AppError::fetch(
                path,
                format!("{} {}", response.status(), response.status_text()),
            ));
        }

        let body = JsFuture::from(response.text().map_err(js_err)?)
            .await
            .map_err(js_err)?;
        body.as_string()
            .ok_or_else(|| AppError::fetch(path, "response body is not text"))
    }
}
