//! Wellness App entry point
//!
//! Wires storage, the event bus and the page loader to the browser shell.
//! The native build runs a headless walk through every page instead.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_app {
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{Document, Element};

    use wellness_app::persistence::{KeyValueStore, LocalStore, MemoryStore};
    use wellness_app::platform::{DomShell, HttpSource};
    use wellness_app::{
        AppSettings, BuiltinModules, DocumentStore, EventBus, PageId, PageLoader, Router,
    };

    fn go(loader: &PageLoader, target: String) {
        let loader = loader.clone();
        spawn_local(async move {
            // Failures are logged and shown by the loader itself
            let _ = loader.navigate(&target).await;
        });
    }

    fn on_click(element: &Element, handler: impl Fn(web_sys::MouseEvent) + 'static) {
        let closure = Closure::<dyn FnMut(_)>::new(handler);
        let _ = element.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    pub async fn run() {
        console_error_panic_hook::set_once();

        let local = LocalStore::open();
        let storage_available = local.is_some();
        let backend: Rc<dyn KeyValueStore> = match local {
            Some(store) => Rc::new(store),
            None => Rc::new(MemoryStore::new()),
        };
        let store = Rc::new(DocumentStore::new(backend));
        let settings = AppSettings::load(&store);

        if console_log::init_with_level(settings.log_level()).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
        log::info!("Wellness App starting...");
        if !storage_available {
            log::warn!("LocalStorage unavailable; data will not survive a reload");
        }

        let Some(shell) = DomShell::new(&settings.content_element) else {
            log::error!("No #{} element to render into", settings.content_element);
            return;
        };
        let shell = Rc::new(shell);
        let fragments = Rc::new(HttpSource);
        let modules = Rc::new(BuiltinModules::new(
            fragments.clone(),
            &settings.catalog_path("exercises.json"),
        ));

        let loader = PageLoader::new(
            Router::from_settings(&settings),
            store,
            Rc::new(EventBus::new()),
            shell.clone(),
            fragments,
            modules,
        );

        {
            let loader = loader.clone();
            shell.on_action(move |action| match loader.route_action(&action) {
                Ok(Some(target)) => go(&loader, target),
                Ok(None) => {}
                Err(err) => log::warn!("{}: {err}", action.name),
            });
        }

        setup_nav_links(shell.document(), &loader);
        setup_avatar_menu(shell.document(), &loader);

        log::info!("Wellness App running!");
        let _ = loader.navigate_to(settings.initial_page).await;
    }

    fn setup_nav_links(document: &Document, loader: &PageLoader) {
        let Ok(links) = document.query_selector_all(".nav-link") else {
            return;
        };
        for i in 0..links.length() {
            let Some(link) = links.item(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let page = PageId::from_nav_id(&link.id());
            let loader = loader.clone();
            on_click(&link, move |event| {
                event.prevent_default();
                go(&loader, page.as_str().to_string());
            });
        }
    }

    fn setup_avatar_menu(document: &Document, loader: &PageLoader) {
        let (Some(button), Some(menu)) = (
            document.get_element_by_id("avatarBtn"),
            document.get_element_by_id("avatarDropdown"),
        ) else {
            return;
        };

        {
            let menu = menu.clone();
            on_click(&button, move |event| {
                event.stop_propagation();
                let _ = menu.class_list().toggle("show");
            });
        }
        if let Some(body) = document.body() {
            let menu = menu.clone();
            on_click(&body, move |_| {
                let _ = menu.class_list().remove_1("show");
            });
        }

        for (id, page) in [
            ("foodsTableBtn", PageId::Foods),
            ("fitnessTableBtn", PageId::FitnessTable),
        ] {
            if let Some(item) = document.get_element_by_id(id) {
                let loader = loader.clone();
                let menu = menu.clone();
                on_click(&item, move |_| {
                    go(&loader, page.as_str().to_string());
                    let _ = menu.class_list().remove_1("show");
                });
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    web_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Wellness App (native) starting...");
    log::info!("The browser build is the real app - serve index.html with the wasm bundle");

    if let Err(err) = headless::walk_all_pages() {
        log::error!("Headless walk failed: {err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::rc::Rc;

    use futures::executor::block_on;

    use wellness_app::platform::{MemoryShell, StaticSource};
    use wellness_app::{
        AppError, BuiltinModules, DocumentStore, EventBus, PageAction, PageId, PageLoader, Router,
    };

    /// Visit every page against in-memory storage and an empty shell
    pub fn walk_all_pages() -> Result<(), AppError> {
        let router = Router::default();
        let fragments = Rc::new(StaticSource::new());
        for page in PageId::ALL {
            let route = router.route(page);
            fragments.insert(&route.fragment_path, &format!("<section id=\"{page}\"></section>"));
        }
        let shell = Rc::new(MemoryShell::new());
        let modules = Rc::new(BuiltinModules::new(fragments.clone(), "data/exercises.json"));
        let loader = PageLoader::new(
            router,
            Rc::new(DocumentStore::in_memory()),
            Rc::new(EventBus::new()),
            shell.clone(),
            fragments,
            modules,
        );

        for page in PageId::ALL {
            let outcome = block_on(loader.navigate_to(page))?;
            log::info!("{outcome:?}");
        }

        block_on(loader.navigate_to(PageId::Nutrition))?;
        loader.dispatch(&PageAction::new("add-to-meal").with("id", 1))?;
        log::info!("Meals after one add:\n{}", shell.slot("mealsContainer").unwrap_or_default());
        println!("✓ Visited {} pages", PageId::ALL.len());
        Ok(())
    }
}
