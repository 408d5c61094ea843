//! The page shell: one content container plus the navigation indicator

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::router::PageId;

pub trait Shell {
    fn show_loading(&self);
    /// Replace the content container with a page fragment
    fn inject(&self, html: &str);
    fn show_error(&self, message: &str);
    /// Mark exactly the link for `page` as active
    fn set_active_nav(&self, page: PageId);
    /// Replace the contents of an element inside the current fragment.
    ///
    /// Returns false when the fragment has no such element.
    fn render(&self, slot: &str, html: &str) -> bool;
}

pub const LOADING_HTML: &str = r#"<div class="loading-container"><i class="fas fa-spinner fa-spin"></i> Loading...</div>"#;

pub fn error_html(message: &str) -> String {
    format!(
        r#"<div class="error-container"><h4>Error</h4><p>{}</p><p>Choose a page from the menu to try again.</p></div>"#,
        super::escape_html(message)
    )
}

/// Headless shell that records what would have been shown
#[derive(Debug, Default)]
pub struct MemoryShell {
    content: RefCell<String>,
    slots: RefCell<HashMap<String, String>>,
    active_nav: Cell<Option<PageId>>,
    injections: Cell<usize>,
}

impl MemoryShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    pub fn slot(&self, slot: &str) -> Option<String> {
        self.slots.borrow().get(slot).cloned()
    }

    pub fn active_nav(&self) -> Option<PageId> {
        self.active_nav.get()
    }

    /// Number of fragments injected so far
    pub fn injections(&self) -> usize {
        self.injections.get()
    }

    pub fn is_showing_error(&self) -> bool {
        self.content.borrow().contains("error-container")
    }
}

impl Shell for MemoryShell {
    fn show_loading(&self) {
        *self.content.borrow_mut() = LOADING_HTML.to_string();
    }

    fn inject(&self, html: &str) {
        *self.content.borrow_mut() = html.to_string();
        self.slots.borrow_mut().clear();
        self.injections.set(self.injections.get() + 1);
    }

    fn show_error(&self, message: &str) {
        *self.content.borrow_mut() = error_html(message);
        self.slots.borrow_mut().clear();
    }

    fn set_active_nav(&self, page: PageId) {
        self.active_nav.set(Some(page));
    }

    fn render(&self, slot: &str, html: &str) -> bool {
        self.slots
            .borrow_mut()
            .insert(slot.to_string(), html.to_string());
        true
    }
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomShell;

#[cfg(target_arch = "wasm32")]
mod dom {
    use std::collections::BTreeMap;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, Element, HtmlInputElement};

    use super::{LOADING_HTML, Shell, error_html};
    use crate::loader::PageAction;
    use crate::router::PageId;

    /// Shell backed by the real document
    pub struct DomShell {
        document: Document,
        content: Element,
    }

    impl DomShell {
        pub fn new(content_id: &str) -> Option<Self> {
            let document = web_sys::window()?.document()?;
            let content = document.get_element_by_id(content_id)?;
            Some(Self { document, content })
        }

        pub fn document(&self) -> &Document {
            &self.document
        }

        /// Install one delegated listener per event type on the content
        /// container. The container outlives every fragment, so re-injected
        /// markup never carries stale handlers.
        pub fn on_action(&self, handler: impl Fn(PageAction) + 'static) {
            let handler = std::rc::Rc::new(handler);
            for event_type in ["click", "change"] {
                let handler = handler.clone();
                let document = self.document.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                    let Some(target) = event
                        .target()
                        .and_then(|t| t.dyn_into::<Element>().ok())
                    else {
                        return;
                    };
                    let Ok(Some(element)) = target.closest("[data-action]") else {
                        return;
                    };
                    // Buttons act on click, inputs on change
                    let is_input = element.dyn_ref::<HtmlInputElement>().is_some();
                    if (event.type_() == "change") != is_input {
                        return;
                    }
                    if let Some(action) = read_action(&document, &element) {
                        event.prevent_default();
                        handler(action);
                    }
                });
                let _ = self
                    .content
                    .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref());
                closure.forget();
            }
        }
    }

    /// Build an action from `data-*` attributes, the element's own value and
    /// the named inputs of the form referenced by `data-form`
    fn read_action(document: &Document, element: &Element) -> Option<PageAction> {
        let name = element.get_attribute("data-action")?;
        let mut params = BTreeMap::new();

        for attr in element.get_attribute_names().iter() {
            let Some(attr) = attr.as_string() else { continue };
            if let Some(key) = attr.strip_prefix("data-") {
                if key != "action" && key != "form" {
                    if let Some(value) = element.get_attribute(&attr) {
                        params.insert(key.to_string(), value);
                    }
                }
            }
        }

        if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            params.insert("value".to_string(), input.value());
        }

        if let Some(form_id) = element.get_attribute("data-form") {
            if let Ok(inputs) = document.query_selector_all(&format!("#{form_id} [name]")) {
                for i in 0..inputs.length() {
                    let Some(node) = inputs.item(i) else { continue };
                    let Ok(field) = node.dyn_into::<Element>() else { continue };
                    let Some(key) = field.get_attribute("name") else { continue };
                    let value = match field.dyn_ref::<HtmlInputElement>() {
                        Some(input) => input.value(),
                        None => js_sys::Reflect::get(&field, &JsValue::from_str("value"))
                            .ok()
                            .and_then(|v| v.as_string())
                            .unwrap_or_default(),
                    };
                    params.insert(key, value);
                }
            }
        }

        Some(PageAction { name, params })
    }

    impl Shell for DomShell {
        fn show_loading(&self) {
            self.content.set_inner_html(LOADING_HTML);
        }

        fn inject(&self, html: &str) {
            self.content.set_inner_html(html);
        }

        fn show_error(&self, message: &str) {
            self.content.set_inner_html(&error_html(message));
        }

        fn set_active_nav(&self, page: PageId) {
            if let Ok(links) = self.document.query_selector_all(".nav-link") {
                for i in 0..links.length() {
                    if let Some(link) = links.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                        let _ = link.class_list().remove_1("active");
                    }
                }
            }
            if let Some(link) = page.nav_id().and_then(|id| self.document.get_element_by_id(id)) {
                let _ = link.class_list().add_1("active");
            }
        }

        fn render(&self, slot: &str, html: &str) -> bool {
            match self.document.get_element_by_id(slot) {
                Some(el) => {
                    el.set_inner_html(html);
                    true
                }
                None => false,
            }
        }
    }
}
