//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Fetching fragments and catalogs (`window.fetch` on web)
//! - The page shell (DOM on web, recorded in memory natively)

pub mod fetch;
pub mod shell;

#[cfg(target_arch = "wasm32")]
pub use fetch::HttpSource;
pub use fetch::{FragmentSource, StaticSource};
#[cfg(target_arch = "wasm32")]
pub use shell::DomShell;
pub use shell::{MemoryShell, Shell};

/// Escape text for use inside element content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
