//! Page identifiers, route resolution and the loaded-module registry

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::settings::AppSettings;

/// Closed set of pages the shell can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageId {
    Goals,
    Nutrition,
    Fitness,
    Wellness,
    Foods,
    FitnessTable,
    GoalsManager,
}

impl PageId {
    pub const ALL: [PageId; 7] = [
        PageId::Goals,
        PageId::Nutrition,
        PageId::Fitness,
        PageId::Wellness,
        PageId::Foods,
        PageId::FitnessTable,
        PageId::GoalsManager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageId::Goals => "goals",
            PageId::Nutrition => "nutrition",
            PageId::Fitness => "fitness",
            PageId::Wellness => "wellness",
            PageId::Foods => "foods",
            PageId::FitnessTable => "fitness-table",
            PageId::GoalsManager => "goals-manager",
        }
    }

    /// Element id of the navigation link for this page, if it has one
    pub fn nav_id(&self) -> Option<&'static str> {
        match self {
            PageId::Goals => Some("nav-goals"),
            PageId::Nutrition => Some("nav-nutrition"),
            PageId::Fitness => Some("nav-fitness"),
            PageId::Wellness => Some("nav-wellness"),
            PageId::Foods => Some("nav-foods"),
            PageId::FitnessTable | PageId::GoalsManager => None,
        }
    }

    /// Page behind a navigation link; unknown links go to goals
    pub fn from_nav_id(nav_id: &str) -> Self {
        PageId::ALL
            .into_iter()
            .find(|p| p.nav_id() == Some(nav_id))
            .unwrap_or(PageId::Goals)
    }

    /// Conventional entry point name, e.g. `initFitnessTablePage`
    pub fn init_symbol(&self) -> String {
        let camel: String = self
            .as_str()
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect();
        format!("init{camel}Page")
    }
}

impl FromStr for PageId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::UnknownPage(s.to_string()))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a page's markup and behavior come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    pub page: PageId,
    pub fragment_path: String,
    pub module_path: String,
}

#[derive(Debug, Clone)]
pub struct Router {
    fragment_base: String,
    module_base: String,
}

impl Default for Router {
    fn default() -> Self {
        Self::new("pages", "js")
    }
}

impl Router {
    pub fn new(fragment_base: &str, module_base: &str) -> Self {
        Self {
            fragment_base: fragment_base.trim_end_matches('/').to_string(),
            module_base: module_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(&settings.fragment_base, &settings.module_base)
    }

    pub fn route(&self, page: PageId) -> PageRoute {
        PageRoute {
            page,
            fragment_path: format!("{}/{}.html", self.fragment_base, page.as_str()),
            module_path: format!("{}/{}.js", self.module_base, page.as_str()),
        }
    }

    /// Look up a page by its identifier string
    pub fn resolve(&self, page_id: &str) -> Result<PageRoute, AppError> {
        page_id.parse().map(|page| self.route(page))
    }
}

/// Loaded module instances, plus the pages whose first `init` succeeded.
///
/// Neither collection shrinks: modules are reinitialized, never unloaded.
pub struct ModuleRegistry<M> {
    modules: HashMap<PageId, M>,
    initialized: HashSet<PageId>,
}

impl<M> Default for ModuleRegistry<M> {
    fn default() -> Self {
        Self {
            modules: HashMap::new(),
            initialized: HashSet::new(),
        }
    }
}

impl<M: Clone> ModuleRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly loaded module; the first registration wins
    pub fn register(&mut self, page: PageId, module: M) -> M {
        self.modules.entry(page).or_insert(module).clone()
    }

    pub fn get(&self, page: PageId) -> Option<M> {
        self.modules.get(&page).cloned()
    }

    pub fn is_loaded(&self, page: PageId) -> bool {
        self.modules.contains_key(&page)
    }

    pub fn mark_initialized(&mut self, page: PageId) {
        self.initialized.insert(page);
    }

    pub fn is_initialized(&self, page: PageId) -> bool {
        self.initialized.contains(&page)
    }

    pub fn initialized_count(&self) -> usize {
        self.initialized.len()
    }
}
