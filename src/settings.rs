//! Application settings
//!
//! Persisted as its own document in LocalStorage, separate from user data.

use serde::{Deserialize, Serialize};

use crate::persistence::{DocumentStore, StoredDocument};
use crate::router::PageId;

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Page shown at startup
    pub initial_page: PageId,

    // === Asset locations (relative to index.html) ===
    /// Directory holding page fragments (`<id>.html`)
    pub fragment_base: String,
    /// Directory holding page scripts (`<id>.js`)
    pub module_base: String,
    /// Directory holding catalogs such as `exercises.json`
    pub data_base: String,

    // === Shell ===
    /// Element id of the container fragments are injected into
    pub content_element: String,
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            initial_page: PageId::Goals,

            fragment_base: "pages".to_string(),
            module_base: "js".to_string(),
            data_base: "data".to_string(),

            content_element: "content".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl StoredDocument for AppSettings {
    const KEY: &'static str = "appSettings";

    fn default_document() -> Self {
        Self::default()
    }
}

impl AppSettings {
    /// Load settings, falling back to defaults on first run or bad data
    pub fn load(store: &DocumentStore) -> Self {
        let settings: Self = store.load();
        log::info!("Settings loaded (initial page: {})", settings.initial_page);
        settings
    }

    pub fn save(&self, store: &DocumentStore) {
        match store.save(self) {
            Ok(()) => log::info!("Settings saved"),
            Err(err) => log::warn!("Settings not saved: {err}"),
        }
    }

    /// Parsed log level; unknown names fall back to `Info`
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    pub fn catalog_path(&self, file: &str) -> String {
        format!("{}/{}", self.data_base.trim_end_matches('/'), file)
    }
}
