//! Wellness App - local-first nutrition, fitness and wellness tracker
//!
//! Core modules:
//! - `persistence`: Versioned JSON documents over browser LocalStorage
//! - `events`: Single-threaded publish/subscribe bus
//! - `router`: Page identifiers, asset paths and the module registry
//! - `loader`: Page lifecycle controller (fetch, inject, init/reinit)
//! - `pages`: Behavior module for each page
//! - `platform`: Browser/headless shell and fragment sources
//! - `settings`: Shell configuration

pub mod error;
pub mod events;
pub mod loader;
pub mod pages;
pub mod persistence;
pub mod platform;
pub mod router;
pub mod settings;

pub use error::AppError;
pub use events::{EventBus, topics};
pub use loader::{LoaderState, NavigationOutcome, PageAction, PageLoader};
pub use pages::BuiltinModules;
pub use persistence::DocumentStore;
pub use router::{PageId, Router};
pub use settings::AppSettings;
