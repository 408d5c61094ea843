//! Behavior modules, one per page
//!
//! Each module keeps its own state between activations and re-reads its
//! documents on every `init`/`reinit`, so changes made on other pages are
//! always picked up.

pub mod catalog;
pub mod fitness;
pub mod fitness_table;
pub mod foods;
pub mod goals;
pub mod nutrition;
pub mod wellness;

use std::rc::Rc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::loader::{ModuleSource, PageModule};
use crate::platform::{FragmentSource, escape_html};
use crate::router::{PageId, PageRoute};

/// Module source for the pages compiled into this crate
pub struct BuiltinModules {
    source: Rc<dyn FragmentSource>,
    catalog_path: String,
}

impl BuiltinModules {
    /// `catalog_path` is where the exercise catalog is fetched from
    pub fn new(source: Rc<dyn FragmentSource>, catalog_path: &str) -> Self {
        Self {
            source,
            catalog_path: catalog_path.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl ModuleSource for BuiltinModules {
    async fn load(&self, route: &PageRoute) -> Result<Box<dyn PageModule>, AppError> {
        let module: Box<dyn PageModule> = match route.page {
            PageId::Goals => Box::new(goals::GoalsPage::display()),
            PageId::GoalsManager => Box::new(goals::GoalsPage::manager()),
            PageId::Nutrition => Box::new(nutrition::NutritionPage::new()),
            PageId::Foods => Box::new(foods::FoodsPage::new()),
            PageId::Wellness => Box::new(wellness::WellnessPage::new()),
            PageId::Fitness => {
                let base = catalog::fetch_catalog(self.source.as_ref(), &self.catalog_path).await;
                Box::new(fitness::FitnessPage::new(base))
            }
            PageId::FitnessTable => {
                let base = catalog::fetch_catalog(self.source.as_ref(), &self.catalog_path).await;
                Box::new(fitness_table::FitnessTablePage::new(base))
            }
        };
        log::debug!("Built {} for {}", route.page.init_symbol(), route.module_path);
        Ok(module)
    }
}

/// Numeric part of a macro string such as `"62g"`; anything unparsable is 0
pub fn parse_numeric(value: &str) -> f64 {
    let digits: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(0.0)
}

/// Round and group thousands: `12345.6` -> `"12,346"`
pub fn format_number(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Filter button row; `active` gets the `active` class
pub(crate) fn filter_buttons(action: &str, options: &[(&str, &str)], active: &str) -> String {
    let mut html = String::from(r#"<div class="filter-buttons">"#);
    for (key, label) in options {
        let class = if *key == active { " active" } else { "" };
        html.push_str(&format!(
            r#"<button class="filter-btn{class}" data-action="{action}" data-group="{}">{}</button>"#,
            escape_html(key),
            escape_html(label)
        ));
    }
    html.push_str("</div>");
    html
}

fn unknown_action(page: PageId, name: &str) -> AppError {
    AppError::invalid_action(format!("{page} has no action `{name}`"))
}
