//! Goals and goals-manager pages
//!
//! Both pages edit the same `goalsData` document. The goals page renders
//! goals as text with inline editing; the manager renders every goal as an
//! input that saves on change.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::unknown_action;
use crate::error::AppError;
use crate::events::topics;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::persistence::{DocumentStore, StoredDocument};
use crate::platform::escape_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalCategory {
    Nutrition,
    Fitness,
    Wellness,
}

impl FromStr for GoalCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::invalid_action(format!("unknown goal category `{s}`")))
    }
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 3] = [
        GoalCategory::Nutrition,
        GoalCategory::Fitness,
        GoalCategory::Wellness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Nutrition => "nutrition",
            GoalCategory::Fitness => "fitness",
            GoalCategory::Wellness => "wellness",
        }
    }

    /// Id of the `<ul>` the category renders into
    pub fn list_id(&self) -> String {
        format!("{}GoalsList", self.as_str())
    }

    /// Per-category keys used before `goalsData` existed, in lookup order
    fn legacy_keys(&self) -> [&'static str; 2] {
        match self {
            GoalCategory::Nutrition => ["goals_nutrition", "goals-nutrition"],
            GoalCategory::Fitness => ["goals_fitness", "goals-fitness"],
            GoalCategory::Wellness => ["goals_wellness", "goals-wellness"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsData {
    pub nutrition: Vec<String>,
    pub fitness: Vec<String>,
    pub wellness: Vec<String>,
}

impl Default for GoalsData {
    fn default() -> Self {
        Self {
            nutrition: vec![
                "Eat 200g protein daily".to_string(),
                "Stay under 2500 calories".to_string(),
            ],
            fitness: vec![
                "Train 5x per week".to_string(),
                "Increase strength by 10%".to_string(),
            ],
            wellness: vec![
                "Sleep 8 hours".to_string(),
                "Meditate 10 min daily".to_string(),
            ],
        }
    }
}

impl StoredDocument for GoalsData {
    const KEY: &'static str = "goalsData";

    fn default_document() -> Self {
        Self::default()
    }
}

impl GoalsData {
    /// Load `goalsData`, assembling it from the per-category keys of older
    /// versions when it does not exist yet
    pub fn load(store: &DocumentStore) -> Self {
        if store.contains(Self::KEY) {
            return store.load();
        }
        match Self::from_legacy(store) {
            Some(data) => {
                log::info!("Migrated per-category goals into `{}`", Self::KEY);
                if let Err(err) = store.save(&data) {
                    log::warn!("Could not persist migrated goals: {err}");
                }
                data
            }
            None => Self::default(),
        }
    }

    fn from_legacy(store: &DocumentStore) -> Option<Self> {
        let mut found = false;
        let mut data = Self {
            nutrition: Vec::new(),
            fitness: Vec::new(),
            wellness: Vec::new(),
        };
        for category in GoalCategory::ALL {
            for key in category.legacy_keys() {
                found |= store.contains(key);
                let value = store.get_value(key, Value::Null);
                if let Ok(goals) = serde_json::from_value::<Vec<String>>(value) {
                    *data.list_mut(category) = goals;
                    break;
                }
            }
        }
        found.then_some(data)
    }

    pub fn list(&self, category: GoalCategory) -> &[String] {
        match category {
            GoalCategory::Nutrition => &self.nutrition,
            GoalCategory::Fitness => &self.fitness,
            GoalCategory::Wellness => &self.wellness,
        }
    }

    fn list_mut(&mut self, category: GoalCategory) -> &mut Vec<String> {
        match category {
            GoalCategory::Nutrition => &mut self.nutrition,
            GoalCategory::Fitness => &mut self.fitness,
            GoalCategory::Wellness => &mut self.wellness,
        }
    }

    pub fn add(&mut self, category: GoalCategory, text: &str) {
        self.list_mut(category).push(text.trim().to_string());
    }

    pub fn update(&mut self, category: GoalCategory, index: usize, text: &str) -> Result<(), AppError> {
        let goal = self
            .list_mut(category)
            .get_mut(index)
            .ok_or_else(|| AppError::invalid_action(format!("no {} goal #{index}", category.as_str())))?;
        *goal = text.trim().to_string();
        Ok(())
    }

    pub fn remove(&mut self, category: GoalCategory, index: usize) -> Result<String, AppError> {
        let list = self.list_mut(category);
        if index >= list.len() {
            return Err(AppError::invalid_action(format!(
                "no {} goal #{index}",
                category.as_str()
            )));
        }
        Ok(list.remove(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GoalsView {
    Display,
    Manager,
}

pub struct GoalsPage {
    view: GoalsView,
    data: GoalsData,
    /// Goal currently shown as an input on the display page
    editing: Option<(GoalCategory, usize)>,
}

impl GoalsPage {
    pub fn display() -> Self {
        Self::with_view(GoalsView::Display)
    }

    pub fn manager() -> Self {
        Self::with_view(GoalsView::Manager)
    }

    fn with_view(view: GoalsView) -> Self {
        Self {
            view,
            data: GoalsData::default(),
            editing: None,
        }
    }

    pub fn data(&self) -> &GoalsData {
        &self.data
    }

    fn render_all(&self, ctx: &PageContext<'_>) {
        for category in GoalCategory::ALL {
            self.render(category, ctx);
        }
    }

    fn render(&self, category: GoalCategory, ctx: &PageContext<'_>) {
        let html = match self.view {
            GoalsView::Display => self.render_display(category),
            GoalsView::Manager => self.render_manager(category),
        };
        ctx.render(&category.list_id(), &html);
    }

    fn render_display(&self, category: GoalCategory) -> String {
        let goals = self.data.list(category);
        if goals.is_empty() {
            return r#"<li class="empty-state">No goals yet. Click "Add Goal" to get started!</li>"#
                .to_string();
        }
        let cat = category.as_str();
        goals
            .iter()
            .enumerate()
            .map(|(index, goal)| {
                if self.editing == Some((category, index)) {
                    format!(
                        r#"<li class="goal-item"><input type="text" class="goal-input" value="{}" data-action="edit-goal" data-category="{cat}" data-index="{index}"><div class="goal-actions"><button class="btn btn-sm btn-secondary" data-action="cancel-edit" title="Cancel"><i class="bi bi-x-lg"></i></button></div></li>"#,
                        escape_html(goal)
                    )
                } else {
                    format!(
                        r#"<li class="goal-item"><span class="goal-text">{}</span><div class="goal-actions"><button class="btn btn-sm btn-light" data-action="start-edit" data-category="{cat}" data-index="{index}" title="Edit"><i class="bi bi-pencil text-warning"></i></button><button class="btn btn-sm btn-light" data-action="delete-goal" data-category="{cat}" data-index="{index}" title="Delete"><i class="bi bi-trash text-danger"></i></button></div></li>"#,
                        escape_html(goal)
                    )
                }
            })
            .collect()
    }

    fn render_manager(&self, category: GoalCategory) -> String {
        let cat = category.as_str();
        self.data
            .list(category)
            .iter()
            .enumerate()
            .map(|(index, goal)| {
                format!(
                    r#"<li class="d-flex align-items-center mb-2 goal-row"><input id="{cat}-goal-{index}" type="text" class="form-control shadow-sm flex-grow-1 me-3 goal-input" value="{}" data-action="save-goal" data-category="{cat}" data-index="{index}"><div class="goal-actions d-flex flex-shrink-0"><button class="btn btn-sm btn-light" data-action="delete-goal" data-category="{cat}" data-index="{index}" title="Delete"><i class="bi bi-trash text-danger"></i></button></div></li>"#,
                    escape_html(goal)
                )
            })
            .collect()
    }

    fn category(action: &PageAction) -> Result<GoalCategory, AppError> {
        action.param("category")?.parse()
    }

    /// Apply an edit; `Ok(None)` when nothing needs saving
    fn apply(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<Option<GoalCategory>, AppError> {
        let category = Self::category(action)?;
        match action.name.as_str() {
            "add-goal" => {
                let text = action.optional("goal").unwrap_or("");
                // The manager adds a blank row to fill in; the display page needs text
                if text.trim().is_empty() && self.view == GoalsView::Display {
                    return Ok(None);
                }
                self.data.add(category, text);
            }
            "start-edit" => {
                self.editing = Some((category, action.parse("index")?));
                return Ok(None);
            }
            "edit-goal" => {
                let index = action.parse("index")?;
                self.editing = None;
                match action.optional("value") {
                    Some(text) => self.data.update(category, index, text)?,
                    // Clearing a goal deletes it
                    None => {
                        self.data.remove(category, index)?;
                    }
                }
            }
            "save-goal" => {
                let index = action.parse("index")?;
                self.data
                    .update(category, index, action.params.get("value").map_or("", String::as_str))?;
            }
            "delete-goal" => {
                self.editing = None;
                self.data.remove(category, action.parse("index")?)?;
            }
            other => return Err(unknown_action(ctx.page, other)),
        }
        Ok(Some(category))
    }
}

impl PageModule for GoalsPage {
    fn init(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.data = GoalsData::load(ctx.store);
        self.editing = None;
        self.render_all(ctx);
        Ok(())
    }

    fn reinit(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.init(ctx)
    }

    fn handle(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<(), AppError> {
        if action.name == "cancel-edit" {
            self.editing = None;
            self.render_all(ctx);
            return Ok(());
        }

        let changed = self.apply(action, ctx)?;
        if let Some(category) = changed {
            ctx.store.save(&self.data)?;
            ctx.publish(topics::GOALS_UPDATED, &json!({ "category": category.as_str() }));
        }
        self.render_all(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::persistence::MemoryStore;
    use crate::platform::MemoryShell;
    use crate::router::PageId;
    use std::rc::Rc;

    struct Fixture {
        store: DocumentStore,
        bus: EventBus,
        shell: MemoryShell,
    }

    impl Fixture {
        fn new(store: DocumentStore) -> Self {
            Self {
                store,
                bus: EventBus::new(),
                shell: MemoryShell::new(),
            }
        }

        fn ctx(&self, page: PageId) -> PageContext<'_> {
            PageContext {
                page,
                store: &self.store,
                bus: &self.bus,
                shell: &self.shell,
            }
        }
    }

    #[test]
    fn test_category_parses_from_action_text() {
        for category in GoalCategory::ALL {
            assert_eq!(category.as_str().parse::<GoalCategory>(), Ok(category));
        }
        assert!(matches!("Fitness".parse::<GoalCategory>(), Err(AppError::InvalidAction(_))));
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let fx = Fixture::new(DocumentStore::in_memory());
        let mut page = GoalsPage::display();
        page.init(&fx.ctx(PageId::Goals)).unwrap();

        assert_eq!(page.data(), &GoalsData::default());
        let html = fx.shell.slot("nutritionGoalsList").unwrap();
        assert!(html.contains("Eat 200g protein daily"));
    }

    #[test]
    fn test_legacy_per_category_keys_are_migrated() {
        let backend = MemoryStore::new()
            .with_item("goals_nutrition", r#"["Eat greens"]"#)
            .with_item("goals-fitness", r#"["Run 5k"]"#)
            .with_item("goals_wellness", "{broken");
        let fx = Fixture::new(DocumentStore::new(Rc::new(backend)));

        let data = GoalsData::load(&fx.store);
        assert_eq!(data.nutrition, vec!["Eat greens"]);
        assert_eq!(data.fitness, vec!["Run 5k"]);
        assert!(data.wellness.is_empty());
        assert!(fx.store.contains("goalsData"));
        assert_eq!(fx.store.load::<GoalsData>(), data);
    }

    #[test]
    fn test_legacy_bare_goals_data_is_read() {
        let backend = MemoryStore::new().with_item(
            "goalsData",
            r#"{"nutrition":["A"],"fitness":[],"wellness":["B"]}"#,
        );
        let fx = Fixture::new(DocumentStore::new(Rc::new(backend)));
        let data = GoalsData::load(&fx.store);
        assert_eq!(data.nutrition, vec!["A"]);
        assert_eq!(data.wellness, vec!["B"]);
    }

    #[test]
    fn test_add_edit_delete_publish_updates() {
        let fx = Fixture::new(DocumentStore::in_memory());
        let published = Rc::new(std::cell::Cell::new(0));
        let counter = published.clone();
        fx.bus.subscribe(topics::GOALS_UPDATED, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        let mut page = GoalsPage::display();
        let ctx = fx.ctx(PageId::Goals);
        page.init(&ctx).unwrap();

        let add = PageAction::new("add-goal")
            .with("category", "fitness")
            .with("goal", "  Stretch daily ");
        page.handle(&add, &ctx).unwrap();
        assert_eq!(page.data().fitness.last().unwrap(), "Stretch daily");

        // Blank input on the display page is ignored
        let blank = PageAction::new("add-goal").with("category", "fitness").with("goal", " ");
        page.handle(&blank, &ctx).unwrap();
        assert_eq!(page.data().fitness.len(), 3);

        let edit = PageAction::new("edit-goal")
            .with("category", "fitness")
            .with("index", 0)
            .with("value", "<b>Train 6x</b>");
        page.handle(&edit, &ctx).unwrap();
        assert!(fx.shell.slot("fitnessGoalsList").unwrap().contains("&lt;b&gt;Train 6x"));

        // Saving an emptied goal deletes it
        let clear = PageAction::new("edit-goal")
            .with("category", "fitness")
            .with("index", 0)
            .with("value", "");
        page.handle(&clear, &ctx).unwrap();
        assert_eq!(page.data().fitness.len(), 2);

        assert_eq!(published.get(), 3);
        assert_eq!(fx.store.load::<GoalsData>(), page.data().clone());
    }

    #[test]
    fn test_manager_adds_blank_row_and_saves_on_change() {
        let fx = Fixture::new(DocumentStore::in_memory());
        let mut page = GoalsPage::manager();
        let ctx = fx.ctx(PageId::GoalsManager);
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("add-goal").with("category", "wellness"), &ctx)
            .unwrap();
        assert_eq!(page.data().wellness.len(), 3);
        assert_eq!(page.data().wellness[2], "");

        let save = PageAction::new("save-goal")
            .with("category", "wellness")
            .with("index", 2)
            .with("value", "Walk outside");
        page.handle(&save, &ctx).unwrap();
        assert_eq!(fx.store.load::<GoalsData>().wellness[2], "Walk outside");
        assert!(fx.shell.slot("wellnessGoalsList").unwrap().contains("save-goal"));
    }

    #[test]
    fn test_empty_category_and_bad_index() {
        let fx = Fixture::new(DocumentStore::in_memory());
        let mut page = GoalsPage::display();
        let ctx = fx.ctx(PageId::Goals);
        page.init(&ctx).unwrap();

        for index in [1, 0] {
            let delete = PageAction::new("delete-goal")
                .with("category", "nutrition")
                .with("index", index);
            page.handle(&delete, &ctx).unwrap();
        }
        assert!(fx.shell.slot("nutritionGoalsList").unwrap().contains("empty-state"));

        let bad = PageAction::new("delete-goal")
            .with("category", "nutrition")
            .with("index", 0);
        assert!(matches!(page.handle(&bad, &ctx), Err(AppError::InvalidAction(_))));
        let unknown = PageAction::new("add-goal").with("category", "sleep");
        assert!(matches!(page.handle(&unknown, &ctx), Err(AppError::InvalidAction(_))));
    }
}
