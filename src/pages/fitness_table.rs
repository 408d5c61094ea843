//! Fitness-table page: browse the exercise catalog and manage custom exercises
//!
//! The session list is the base catalog with stored custom exercises
//! applied. Any exercise the user creates or edits is marked
//! `created_by: "User"` and only those are written back. A deleted catalog
//! exercise stays hidden for the rest of the session and returns on reload.

use std::collections::HashSet;

use rand::Rng;
use serde_json::json;

use super::catalog::{CatalogExercise, CustomExercises, Reps, USER_AUTHOR, merge_custom};
use super::fitness::EDIT_EXERCISE_KEY;
use super::{filter_buttons, unknown_action};
use crate::error::AppError;
use crate::events::topics;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::platform::escape_html;

const DEFAULT_TIPS: &str = "No specific tips provided.";
const CUSTOM_IMAGE: &str = "/images/exercises/custom.png";
const DEFAULT_REST_SECS: u32 = 60;

const CATEGORIES: [(&str, &str); 7] = [
    ("all", "All"),
    ("chest", "Chest"),
    ("back", "Back"),
    ("legs", "Legs"),
    ("shoulders", "Shoulders"),
    ("arms", "Arms"),
    ("core", "Core"),
];

const DIFFICULTIES: [(&str, &str); 4] = [
    ("all", "All"),
    ("beginner", "Beginner"),
    ("intermediate", "Intermediate"),
    ("advanced", "Advanced"),
];

/// Random RFC 4122 version-4 identifier
pub fn new_exercise_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes[..]);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Category, equipment and difficulty filters; `all` disables a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFilters {
    pub category: String,
    pub equipment: String,
    pub difficulty: String,
}

impl Default for TableFilters {
    fn default() -> Self {
        Self {
            category: "all".to_string(),
            equipment: "all".to_string(),
            difficulty: "all".to_string(),
        }
    }
}

impl TableFilters {
    pub fn matches(&self, ex: &CatalogExercise) -> bool {
        let field = |filter: &str, value: &str| filter == "all" || value.to_lowercase() == filter;
        field(self.category.as_str(), ex.category.as_str())
            && field(self.equipment.as_str(), ex.equipment.as_str())
            && field(self.difficulty.as_str(), ex.difficulty.as_str())
    }
}

/// Validated exercise form
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseInput {
    pub name: String,
    pub category: String,
    pub equipment: String,
    pub difficulty: String,
    pub primary_muscle: String,
    pub secondary_muscles: Vec<String>,
    pub sets: u32,
    pub reps: Option<u32>,
    pub duration: u32,
    pub calories_per_minute: f64,
    pub instructions: String,
    pub tips: String,
    pub video_url: String,
}

impl ExerciseInput {
    pub fn from_action(action: &PageAction) -> Result<Self, AppError> {
        let required = |key: &str| -> Result<String, AppError> {
            action
                .optional(key)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| AppError::invalid_action(format!("`{key}` is required")))
        };
        let text = |key: &str| action.optional(key).unwrap_or_default().trim().to_string();

        let reps = match action.optional("reps") {
            Some(_) => Some(action.parse("reps")?),
            None => None,
        };
        let calories_per_minute = match action.optional("calories_per_minute") {
            Some(_) => action.parse("calories_per_minute")?,
            None => 0.0,
        };

        Ok(Self {
            name: required("name")?,
            category: required("category")?,
            equipment: required("equipment")?,
            difficulty: required("difficulty")?,
            primary_muscle: required("primary_muscle")?,
            secondary_muscles: text("secondary_muscles")
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
            sets: action.parse("sets")?,
            reps,
            duration: action.parse("duration")?,
            calories_per_minute,
            instructions: text("instructions"),
            tips: text("tips"),
            video_url: text("video_url"),
        })
    }

    /// Copy the form onto `ex`, marking it as user data
    pub fn apply(self, ex: &mut CatalogExercise) {
        ex.name = self.name;
        ex.category = self.category;
        ex.equipment = self.equipment;
        ex.difficulty = self.difficulty;
        ex.primary_muscle = self.primary_muscle;
        ex.secondary_muscles = self.secondary_muscles;
        ex.sets = self.sets;
        ex.reps = self.reps.map(Reps::Count);
        ex.duration = self.duration;
        ex.calories_per_minute = self.calories_per_minute;
        ex.instructions = self.instructions;
        ex.tips = if self.tips.is_empty() {
            DEFAULT_TIPS.to_string()
        } else {
            self.tips
        };
        ex.video_url = self.video_url;
        ex.created_by = USER_AUTHOR.to_string();
        ex.is_active = true;
    }

    pub fn into_exercise(self) -> CatalogExercise {
        let mut ex = CatalogExercise {
            id: new_exercise_id(),
            rest_time: DEFAULT_REST_SECS,
            image_url: CUSTOM_IMAGE.to_string(),
            kind: "Strength".to_string(),
            weight: None,
            ..Default::default()
        };
        self.apply(&mut ex);
        ex
    }
}

pub struct FitnessTablePage {
    base: Vec<CatalogExercise>,
    exercises: Vec<CatalogExercise>,
    filters: TableFilters,
    editing: Option<String>,
    details: Option<String>,
    /// Catalog ids deleted this session
    hidden: HashSet<String>,
}

impl FitnessTablePage {
    pub fn new(base: Vec<CatalogExercise>) -> Self {
        let exercises = base.clone();
        Self {
            base,
            exercises,
            filters: TableFilters::default(),
            editing: None,
            details: None,
            hidden: HashSet::new(),
        }
    }

    pub fn exercises(&self) -> &[CatalogExercise] {
        &self.exercises
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn visible(&self) -> impl Iterator<Item = &CatalogExercise> {
        self.exercises.iter().filter(|ex| self.filters.matches(ex))
    }

    fn find(&self, id: &str) -> Result<&CatalogExercise, AppError> {
        self.exercises
            .iter()
            .find(|ex| ex.id == id)
            .ok_or_else(|| AppError::invalid_action(format!("no exercise with id {id}")))
    }

    fn load(&mut self, ctx: &PageContext<'_>) {
        let custom: CustomExercises = ctx.store.load();
        self.exercises = merge_custom(&self.base, &custom.0);
        self.exercises.retain(|ex| !self.hidden.contains(&ex.id));
        self.details = None;

        // Hand-off from the fitness page's edit button
        if let Some(id) = ctx.store.get_text(EDIT_EXERCISE_KEY) {
            if let Err(err) = ctx.store.remove(EDIT_EXERCISE_KEY) {
                log::warn!("Could not clear {EDIT_EXERCISE_KEY}: {err}");
            }
            if self.exercises.iter().any(|ex| ex.id == id) {
                self.editing = Some(id);
            } else {
                log::warn!("Requested edit of unknown exercise {id}");
            }
        }
        self.render(ctx);
    }

    fn save(&self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        let custom = CustomExercises(
            self.exercises
                .iter()
                .filter(|ex| ex.is_custom())
                .cloned()
                .collect(),
        );
        ctx.store.save(&custom)?;
        ctx.publish(
            topics::CUSTOM_EXERCISES_UPDATED,
            &json!({ "count": custom.0.len() }),
        );
        Ok(())
    }

    fn render(&self, ctx: &PageContext<'_>) {
        let mut equipment: Vec<(String, String)> = vec![("all".into(), "All".into())];
        for ex in &self.exercises {
            let key = ex.equipment.to_lowercase();
            if !key.is_empty() && !equipment.iter().any(|(k, _)| *k == key) {
                equipment.push((key, ex.equipment.clone()));
            }
        }
        let equipment: Vec<(&str, &str)> = equipment
            .iter()
            .map(|(k, l)| (k.as_str(), l.as_str()))
            .collect();

        ctx.render(
            "categoryFilter",
            &filter_buttons("filter-category", &CATEGORIES, &self.filters.category),
        );
        ctx.render(
            "equipmentFilter",
            &filter_buttons("filter-equipment", &equipment, &self.filters.equipment),
        );
        ctx.render(
            "difficultyFilter",
            &filter_buttons("filter-difficulty", &DIFFICULTIES, &self.filters.difficulty),
        );
        ctx.render("exerciseTableBody", &self.render_rows());
        ctx.render("exerciseDetails", &self.render_details());
        ctx.render("editExerciseForm", &self.render_edit_form());
    }

    fn render_rows(&self) -> String {
        let rows: String = self
            .visible()
            .map(|ex| {
                format!(
                    r#"<tr class="exercise-row" data-exercise-id="{id}"><td class="exercise-name"><strong>{name}</strong></td><td><span class="category-badge category-{group}">{category}</span></td><td>{equipment}</td><td>{muscle}</td><td>{sets} × {reps}</td><td>{minutes} min</td><td><span class="difficulty-badge difficulty-{difficulty_class}">{difficulty}</span></td><td class="action-buttons"><button class="btn btn-sm btn-info me-1" data-action="show-exercise" data-id="{id}" title="View Details"><i class="bi bi-info-circle"></i></button><button class="btn btn-sm btn-warning me-1" data-action="edit-exercise" data-id="{id}" title="Edit Exercise"><i class="bi bi-pencil-square"></i></button><button class="btn btn-sm btn-danger" data-action="delete-exercise" data-id="{id}" title="Delete Exercise"><i class="bi bi-trash3"></i></button></td></tr>"#,
                    id = escape_html(&ex.id),
                    name = escape_html(&ex.name),
                    group = escape_html(&ex.group()),
                    category = escape_html(&ex.category),
                    equipment = escape_html(&ex.equipment),
                    muscle = escape_html(&ex.primary_muscle),
                    sets = ex.sets,
                    reps = escape_html(&ex.reps_label("Time-based")),
                    minutes = ex.duration_minutes(),
                    difficulty_class = escape_html(&ex.difficulty.to_lowercase()),
                    difficulty = escape_html(&ex.difficulty),
                )
            })
            .collect();
        if rows.is_empty() {
            return r#"<tr><td colspan="8" class="text-center py-4 text-muted"><i class="bi bi-search"></i><p class="mb-0 mt-2">No exercises found matching your filters.</p></td></tr>"#.to_string();
        }
        rows
    }

    fn render_details(&self) -> String {
        let Some(ex) = self.details.as_deref().and_then(|id| self.find(id).ok()) else {
            return String::new();
        };
        let secondary = if ex.secondary_muscles.is_empty() {
            "None".to_string()
        } else {
            ex.secondary_muscles.join(", ")
        };
        format!(
            r#"<div class="exercise-details"><h5>{name}</h5><p><strong>Category:</strong> {category}</p><p><strong>Equipment:</strong> {equipment}</p><p><strong>Primary Muscle:</strong> {muscle}</p><p><strong>Secondary Muscles:</strong> {secondary}</p><p><strong>Sets × Reps:</strong> {sets} × {reps}</p><p><strong>Rest Time:</strong> {rest} seconds</p><p><strong>Calories:</strong> {calories} per minute</p><h6>Instructions</h6><p>{instructions}</p><h6>Tips</h6><p class="text-info">{tips}</p><button class="btn btn-secondary" data-action="hide-exercise">Close</button></div>"#,
            name = escape_html(&ex.name),
            category = escape_html(&ex.category),
            equipment = escape_html(&ex.equipment),
            muscle = escape_html(&ex.primary_muscle),
            secondary = escape_html(&secondary),
            sets = ex.sets,
            reps = escape_html(&ex.reps_label("Time-based")),
            rest = ex.rest_time,
            calories = ex.calories_per_minute,
            instructions = escape_html(&ex.instructions),
            tips = escape_html(&ex.tips),
        )
    }

    fn render_edit_form(&self) -> String {
        let Some(ex) = self.editing.as_deref().and_then(|id| self.find(id).ok()) else {
            return String::new();
        };
        let input = |name: &str, label: &str, value: &str| {
            format!(
                r#"<label>{label}<input class="form-control" name="{name}" value="{}"></label>"#,
                escape_html(value)
            )
        };
        let reps = ex.reps.as_ref().map(Reps::to_string).unwrap_or_default();
        let fields = [
            input("name", "Name", &ex.name),
            input("category", "Category", &ex.category),
            input("equipment", "Equipment", &ex.equipment),
            input("difficulty", "Difficulty", &ex.difficulty),
            input("primary_muscle", "Primary Muscle", &ex.primary_muscle),
            input("secondary_muscles", "Secondary Muscles", &ex.secondary_muscles.join(", ")),
            input("sets", "Sets", &ex.sets.to_string()),
            input("reps", "Reps", &reps),
            input("duration", "Duration (seconds)", &ex.duration.to_string()),
            input("calories_per_minute", "Calories per Minute", &ex.calories_per_minute.to_string()),
            input("instructions", "Instructions", &ex.instructions),
            input("tips", "Tips", &ex.tips),
            input("video_url", "Video URL", &ex.video_url),
        ]
        .concat();
        format!(
            r#"<div id="editExerciseFields">{fields}<button class="btn btn-primary" data-action="update-exercise" data-id="{id}" data-form="editExerciseFields">Update Exercise</button><button class="btn btn-secondary" data-action="cancel-edit">Cancel</button></div>"#,
            id = escape_html(&ex.id),
        )
    }
}

impl PageModule for FitnessTablePage {
    fn init(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.filters = TableFilters::default();
        self.editing = None;
        self.load(ctx);
        Ok(())
    }

    fn reinit(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.load(ctx);
        Ok(())
    }

    fn handle(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<(), AppError> {
        match action.name.as_str() {
            "filter-category" => self.filters.category = action.param("group")?.to_string(),
            "filter-equipment" => self.filters.equipment = action.param("group")?.to_string(),
            "filter-difficulty" => self.filters.difficulty = action.param("group")?.to_string(),
            "show-exercise" => {
                let id = self.find(action.param("id")?)?.id.clone();
                self.details = Some(id);
            }
            "hide-exercise" => self.details = None,
            "edit-exercise" => {
                let id = self.find(action.param("id")?)?.id.clone();
                self.editing = Some(id);
            }
            "cancel-edit" => self.editing = None,
            "create-exercise" => {
                let exercise = ExerciseInput::from_action(action)?.into_exercise();
                log::info!("Created exercise {} ({})", exercise.name, exercise.id);
                self.exercises.push(exercise);
                self.save(ctx)?;
            }
            "update-exercise" => {
                let id = action.param("id")?;
                let input = ExerciseInput::from_action(action)?;
                let exercise = self
                    .exercises
                    .iter_mut()
                    .find(|ex| ex.id == id)
                    .ok_or_else(|| AppError::invalid_action(format!("no exercise with id {id}")))?;
                input.apply(exercise);
                self.editing = None;
                self.save(ctx)?;
            }
            "delete-exercise" => {
                let id = action.param("id")?;
                let exercise = self.find(id)?;
                if self.base.iter().any(|ex| ex.id == id) {
                    log::info!("Hiding catalog exercise {} until reload", exercise.name);
                    self.hidden.insert(id.to_string());
                }
                if self.editing.as_deref() == Some(id) {
                    self.editing = None;
                }
                self.exercises.retain(|ex| ex.id != id);
                if self.details.as_deref() == Some(id) {
                    self.details = None;
                }
                self.save(ctx)?;
            }
            other => return Err(unknown_action(ctx.page, other)),
        }
        self.render(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::pages::catalog::embedded_catalog;
    use crate::persistence::DocumentStore;
    use crate::platform::MemoryShell;
    use crate::router::PageId;
    use std::cell::Cell;
    use std::rc::Rc;

    const SQUATS: &str = "550e8400-e29b-41d4-a716-446655440003";

    fn form(action: &str) -> PageAction {
        PageAction::new(action)
            .with("name", "Dead Bug")
            .with("category", "Core")
            .with("equipment", "Bodyweight")
            .with("difficulty", "Beginner")
            .with("primary_muscle", "Abs")
            .with("secondary_muscles", "Hip Flexors, , Obliques")
            .with("sets", 3)
            .with("reps", "")
            .with("duration", 90)
            .with("calories_per_minute", "4")
    }

    fn ctx<'a>(store: &'a DocumentStore, bus: &'a EventBus, shell: &'a MemoryShell) -> PageContext<'a> {
        PageContext {
            page: PageId::FitnessTable,
            store,
            bus,
            shell,
        }
    }

    #[test]
    fn test_exercise_ids_are_v4() {
        let a = new_exercise_id();
        let b = new_exercise_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        let parts: Vec<&str> = a.split('-').collect();
        assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), [8, 4, 4, 4, 12]);
        assert!(parts[2].starts_with('4'));
        assert!(matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
    }

    #[test]
    fn test_form_defaults() {
        let ex = ExerciseInput::from_action(&form("create-exercise"))
            .unwrap()
            .into_exercise();
        assert_eq!(ex.secondary_muscles, ["Hip Flexors", "Obliques"]);
        assert_eq!(ex.reps, None);
        assert_eq!(ex.tips, DEFAULT_TIPS);
        assert_eq!(ex.rest_time, 60);
        assert_eq!(ex.image_url, CUSTOM_IMAGE);
        assert!(ex.is_custom());

        let missing = form("create-exercise").with("primary_muscle", " ");
        assert!(ExerciseInput::from_action(&missing).is_err());
        let bad_sets = form("create-exercise").with("sets", "three");
        assert!(ExerciseInput::from_action(&bad_sets).is_err());
    }

    #[test]
    fn test_create_persists_only_user_exercises() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let published = Rc::new(Cell::new(0));
        let seen = published.clone();
        bus.subscribe(topics::CUSTOM_EXERCISES_UPDATED, move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        });

        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();
        page.handle(&form("create-exercise"), &ctx).unwrap();

        let stored: CustomExercises = store.load();
        assert_eq!(stored.0.len(), 1);
        assert_eq!(stored.0[0].name, "Dead Bug");
        assert_eq!(page.exercises().len(), 7);
        assert_eq!(published.get(), 1);

        // Reactivation rebuilds the list without duplicating the new entry
        page.reinit(&ctx).unwrap();
        page.reinit(&ctx).unwrap();
        assert_eq!(page.exercises().len(), 7);
    }

    #[test]
    fn test_editing_catalog_exercise_makes_it_custom() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("edit-exercise").with("id", SQUATS), &ctx).unwrap();
        assert!(shell.slot("editExerciseForm").unwrap().contains("Squats"));

        page.handle(&form("update-exercise").with("id", SQUATS).with("name", "Goblet Squats"), &ctx)
            .unwrap();
        assert_eq!(page.editing(), None);

        let stored: CustomExercises = store.load();
        assert_eq!(stored.0.len(), 1);
        assert_eq!(stored.0[0].id, SQUATS);

        let mut fresh = FitnessTablePage::new(embedded_catalog());
        fresh.init(&ctx).unwrap();
        assert_eq!(fresh.exercises().len(), 6);
        assert_eq!(fresh.exercises()[2].name, "Goblet Squats");
    }

    #[test]
    fn test_deleted_catalog_exercise_stays_hidden_until_reload() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("delete-exercise").with("id", SQUATS), &ctx).unwrap();
        assert_eq!(page.exercises().len(), 5);

        page.reinit(&ctx).unwrap();
        assert_eq!(page.exercises().len(), 5);
        assert!(!shell.slot("exerciseTableBody").unwrap().contains(SQUATS));

        let mut reloaded = FitnessTablePage::new(embedded_catalog());
        reloaded.init(&ctx).unwrap();
        assert_eq!(reloaded.exercises().len(), 6);
    }

    #[test]
    fn test_deleting_edited_catalog_exercise_hides_it() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&form("update-exercise").with("id", SQUATS), &ctx).unwrap();
        page.handle(&PageAction::new("delete-exercise").with("id", SQUATS), &ctx).unwrap();
        page.reinit(&ctx).unwrap();
        assert!(page.exercises().iter().all(|ex| ex.id != SQUATS));

        let stored: CustomExercises = store.load();
        assert!(stored.0.is_empty());
    }

    #[test]
    fn test_filters_combine() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("filter-equipment").with("group", "bodyweight"), &ctx).unwrap();
        let bodyweight = page.visible().count();
        assert_eq!(bodyweight, 3);

        page.handle(&PageAction::new("filter-category").with("group", "core"), &ctx).unwrap();
        let names: Vec<&str> = page.visible().map(|ex| ex.name.as_str()).collect();
        assert_eq!(names, ["Plank"]);

        page.handle(&PageAction::new("filter-category").with("group", "all"), &ctx).unwrap();
        assert_eq!(page.visible().count(), bodyweight);
    }

    #[test]
    fn test_edit_hand_off_is_consumed() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        store.set_text(EDIT_EXERCISE_KEY, SQUATS).unwrap();

        let mut page = FitnessTablePage::new(embedded_catalog());
        page.init(&ctx).unwrap();
        assert_eq!(page.editing(), Some(SQUATS));
        assert!(!store.contains(EDIT_EXERCISE_KEY));
    }
}
