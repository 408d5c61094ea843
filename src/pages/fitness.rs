//! Fitness page: weekly workout planner over the exercise catalog

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::catalog::{CatalogExercise, CustomExercises, Reps, merge_custom};
use super::{filter_buttons, unknown_action};
use crate::error::AppError;
use crate::events::topics;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::persistence::{SchemaMigrator, StoredDocument, lenient};
use crate::platform::escape_html;

const FILTER_KEY: &str = "fitnessFilter";
/// Handed to the fitness-table page when the user asks to edit an exercise
pub const EDIT_EXERCISE_KEY: &str = "editExerciseId";

pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const MUSCLE_GROUPS: [(&str, &str); 6] = [
    ("chest", "Chest"),
    ("back", "Back"),
    ("legs", "Legs"),
    ("shoulders", "Shoulders"),
    ("arms", "Arms"),
    ("core", "Core"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutEntry {
    pub id: String,
    pub name: String,
    pub group: String,
    pub equipment: String,
    #[serde(deserialize_with = "lenient::whole")]
    pub sets: u32,
    pub reps: Option<Reps>,
    /// Seconds
    #[serde(deserialize_with = "lenient::whole")]
    pub duration: u32,
    pub completed: bool,
}

impl From<&CatalogExercise> for WorkoutEntry {
    fn from(ex: &CatalogExercise) -> Self {
        Self {
            id: ex.id.clone(),
            name: ex.name.clone(),
            group: ex.group(),
            equipment: ex.equipment.clone(),
            sets: ex.sets,
            reps: ex.reps.clone(),
            duration: ex.duration,
            completed: false,
        }
    }
}

/// Weekday -> planned exercises, stored under `workouts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workouts(
    #[serde(deserialize_with = "lenient::keyed_entries")] pub BTreeMap<String, Vec<WorkoutEntry>>,
);

impl Default for Workouts {
    fn default() -> Self {
        Self(WEEKDAYS.iter().map(|d| (d.to_string(), Vec::new())).collect())
    }
}

impl Workouts {
    pub fn day(&self, day: &str) -> &[WorkoutEntry] {
        self.0.get(day).map(Vec::as_slice).unwrap_or_default()
    }

    fn day_mut(&mut self, day: &str) -> &mut Vec<WorkoutEntry> {
        self.0.entry(day.to_string()).or_default()
    }
}

/// v0 -> v1: a day stored as `{A: [...], B: [...]}` becomes one list, A first,
/// then any other sessions in key order. Days already stored as a list are
/// left alone.
pub fn merge_ab_sessions(data: Value) -> Value {
    let Value::Object(days) = data else {
        return data;
    };
    let merged: Map<String, Value> = days
        .into_iter()
        .map(|(day, sessions)| {
            let sessions = match sessions {
                Value::Object(mut split) => {
                    let mut list = match split.remove("A") {
                        Some(Value::Array(a)) => a,
                        _ => Vec::new(),
                    };
                    if let Some(Value::Array(b)) = split.remove("B") {
                        list.extend(b);
                    }
                    for (session, entries) in split {
                        match entries {
                            Value::Array(rest) => list.extend(rest),
                            other => log::warn!("Dropping {day} session `{session}`: {other}"),
                        }
                    }
                    Value::Array(list)
                }
                other => other,
            };
            (day, sessions)
        })
        .collect();
    Value::Object(merged)
}

impl StoredDocument for Workouts {
    const KEY: &'static str = "workouts";

    fn default_document() -> Self {
        Self::default()
    }

    fn migrator() -> SchemaMigrator {
        SchemaMigrator::new(Self::VERSION).with_step(0, "merge A/B sessions", merge_ab_sessions)
    }
}

pub struct FitnessPage {
    base: Vec<CatalogExercise>,
    exercises: Vec<CatalogExercise>,
    workouts: Workouts,
    day: &'static str,
    last_added: Option<(&'static str, WorkoutEntry)>,
    filter: String,
}

impl FitnessPage {
    pub fn new(base: Vec<CatalogExercise>) -> Self {
        let exercises = base.clone();
        Self {
            base,
            exercises,
            workouts: Workouts::default(),
            day: WEEKDAYS[0],
            last_added: None,
            filter: "all".to_string(),
        }
    }

    pub fn exercises(&self) -> &[CatalogExercise] {
        &self.exercises
    }

    pub fn workouts(&self) -> &Workouts {
        &self.workouts
    }

    pub fn active_day(&self) -> &'static str {
        self.day
    }

    fn load(&mut self, ctx: &PageContext<'_>) {
        let custom: CustomExercises = ctx.store.load();
        self.exercises = merge_custom(&self.base, &custom.0);
        self.workouts = ctx.store.load();
        self.filter = ctx.store.get_text(FILTER_KEY).unwrap_or_else(|| "all".to_string());
        log::debug!(
            "Fitness page has {} exercises ({} custom)",
            self.exercises.len(),
            custom.0.len()
        );
        self.render(ctx);
    }

    fn render(&self, ctx: &PageContext<'_>) {
        let mut options = vec![("all", "All")];
        options.extend(MUSCLE_GROUPS);
        ctx.render(
            "fitnessFilter",
            &filter_buttons("filter-exercises", &options, &self.filter),
        );
        ctx.render("dayTabs", &self.render_days());
        ctx.render("fitnessExercisesList", &self.render_exercises());
        ctx.render("workoutsContainer", &self.render_workout());
    }

    fn render_days(&self) -> String {
        WEEKDAYS
            .iter()
            .map(|day| {
                let class = if *day == self.day { " active" } else { "" };
                let mut label = day[..3].to_string();
                label[..1].make_ascii_uppercase();
                format!(r#"<button class="day-btn{class}" data-action="select-day" data-day="{day}">{label}</button>"#)
            })
            .collect()
    }

    fn exercise_row(ex: &CatalogExercise) -> String {
        format!(
            r#"<div class="exercise-item" data-exercise-id="{id}"><div class="exercise-name">{name}</div><div class="exercise-equipment">{equipment}</div><div class="exercise-sets">{sets} × {reps}</div><div class="exercise-duration">{minutes} min</div><button class="btn btn-success btn-sm action-btn add-btn" data-action="add-exercise" data-id="{id}" title="Add to Workout"><i class="bi bi-plus-circle"></i></button><button class="btn btn-warning btn-sm action-btn edit-btn" data-action="edit-exercise" data-id="{id}" data-navigate="fitness-table" title="Edit Exercise"><i class="bi bi-pencil"></i></button></div>"#,
            id = escape_html(&ex.id),
            name = escape_html(&ex.name),
            equipment = escape_html(&ex.equipment),
            sets = ex.sets,
            reps = escape_html(&ex.reps_label("Time")),
            minutes = ex.duration_minutes(),
        )
    }

    fn render_exercises(&self) -> String {
        let active = self.exercises.iter().filter(|ex| ex.is_active);
        if self.filter != "all" {
            let rows: String = active
                .filter(|ex| ex.group() == self.filter)
                .map(Self::exercise_row)
                .collect();
            if rows.is_empty() {
                return r#"<div class="empty-state">No exercises found for this muscle group.</div>"#.to_string();
            }
            return rows;
        }

        let active: Vec<&CatalogExercise> = active.collect();
        let mut html = String::new();
        for (group, label) in MUSCLE_GROUPS {
            let rows: String = active
                .iter()
                .filter(|ex| ex.group() == group)
                .map(|ex| Self::exercise_row(ex))
                .collect();
            if !rows.is_empty() {
                html.push_str(&format!(
                    r#"<div class="exercise-group-section"><h6 class="exercise-group-title">{label}</h6>{rows}</div>"#
                ));
            }
        }
        let other: String = active
            .iter()
            .filter(|ex| !MUSCLE_GROUPS.iter().any(|(g, _)| ex.group() == *g))
            .map(|ex| Self::exercise_row(ex))
            .collect();
        if !other.is_empty() {
            html.push_str(&format!(
                r#"<div class="exercise-group-section"><h6 class="exercise-group-title">Other</h6>{other}</div>"#
            ));
        }
        if html.is_empty() {
            html.push_str(r#"<div class="empty-state">No exercises available.</div>"#);
        }
        html
    }

    fn render_workout(&self) -> String {
        let entries = self.workouts.day(self.day);
        if entries.is_empty() {
            return r#"<div class="empty-workout"><i class="bi bi-calendar-plus"></i><p>No exercises added yet</p><small>Select exercises from the left to build your workout</small></div>"#.to_string();
        }

        let mut html = String::new();
        for entry in entries {
            let full = self.exercises.iter().find(|ex| ex.id == entry.id);
            let difficulty = full.map_or("Unknown", |ex| ex.difficulty.as_str());
            let calories = full.map_or(0.0, |ex| ex.calories_per_minute);
            let target = full.map_or(entry.group.as_str(), |ex| ex.primary_muscle.as_str());
            let (class, icon) = if entry.completed {
                (" completed", "bi-check-square-fill")
            } else {
                ("", "bi-square")
            };
            html.push_str(&format!(
                r#"<div class="workout-item-row{class}"><div class="workout-col workout-checkbox" data-action="toggle-exercise" data-id="{id}"><i class="bi {icon}"></i></div><div class="workout-col workout-name">{name}<div class="workout-equipment">{equipment}</div></div><div class="workout-col workout-target">{target}</div><div class="workout-col workout-sets">{sets} × {reps}</div><div class="workout-col workout-duration">{minutes} min</div><div class="workout-col workout-difficulty difficulty-{difficulty_class}">{difficulty}</div><div class="workout-col workout-calories">{calories} cal/min</div><div class="workout-col workout-actions"><button class="btn btn-light btn-sm action-btn delete-btn" data-action="remove-exercise" data-id="{id}" title="Remove from Workout"><i class="bi bi-trash3 text-danger"></i></button></div></div>"#,
                id = escape_html(&entry.id),
                name = escape_html(&entry.name),
                equipment = escape_html(&entry.equipment),
                target = escape_html(target),
                sets = entry.sets,
                reps = entry.reps.as_ref().map_or_else(|| "Time".to_string(), |r| escape_html(&r.to_string())),
                minutes = entry.duration.div_ceil(60),
                difficulty_class = difficulty.to_lowercase(),
                difficulty = escape_html(difficulty),
            ));
        }

        let summary = WorkoutSummary::of(entries);
        html.push_str(&format!(
            r#"<div class="workout-summary"><div class="summary-stats"><div class="summary-stat"><span class="stat-label">Exercises:</span><span class="stat-value">{}/{}</span></div><div class="summary-stat"><span class="stat-label">Time:</span><span class="stat-value">~{} min</span></div><div class="summary-stat"><span class="stat-label">Progress:</span><span class="stat-value">{pct}%</span></div></div><div class="progress-bar"><div class="progress-fill" style="width: {pct}%"></div></div></div>"#,
            summary.completed,
            summary.total,
            summary.minutes,
            pct = summary.percent(),
        ));
        html.push_str(r#"<div class="workout-bottom-controls"><button class="btn-clear" data-action="clear-workout">Clear Current Workout</button>"#);
        if self.last_added.is_some() {
            html.push_str(r#"<button class="btn-undo" data-action="undo-exercise">Undo Last Add</button>"#);
        }
        html.push_str("</div>");
        html
    }

    fn save(&self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        ctx.store.save(&self.workouts)?;
        ctx.publish(topics::WORKOUTS_UPDATED, &json!({ "day": self.day }));
        Ok(())
    }
}

/// Completion stats for one day's workout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutSummary {
    pub completed: usize,
    pub total: usize,
    pub minutes: u32,
}

impl WorkoutSummary {
    pub fn of(entries: &[WorkoutEntry]) -> Self {
        Self {
            completed: entries.iter().filter(|e| e.completed).count(),
            total: entries.len(),
            minutes: entries.iter().map(|e| e.duration.div_ceil(60)).sum(),
        }
    }

    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

impl PageModule for FitnessPage {
    fn init(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.load(ctx);
        Ok(())
    }

    fn reinit(&mut self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        self.load(ctx);
        Ok(())
    }

    fn handle(&mut self, action: &PageAction, ctx: &PageContext<'_>) -> Result<(), AppError> {
        match action.name.as_str() {
            "select-day" => {
                let day = action.param("day")?;
                self.day = WEEKDAYS
                    .into_iter()
                    .find(|d| *d == day)
                    .ok_or_else(|| AppError::invalid_action(format!("no weekday `{day}`")))?;
            }
            "filter-exercises" => {
                self.filter = action.param("group")?.to_string();
                if let Err(err) = ctx.store.set_text(FILTER_KEY, &self.filter) {
                    log::warn!("Could not remember fitness filter: {err}");
                }
            }
            "add-exercise" => {
                let id = action.param("id")?;
                let exercise = self
                    .exercises
                    .iter()
                    .find(|ex| ex.id == id)
                    .ok_or_else(|| AppError::invalid_action(format!("no exercise with id {id}")))?;
                let entry = WorkoutEntry::from(exercise);
                self.workouts.day_mut(self.day).push(entry.clone());
                self.last_added = Some((self.day, entry));
                self.save(ctx)?;
            }
            "remove-exercise" => {
                let id = action.param("id")?;
                self.workouts.day_mut(self.day).retain(|e| e.id != id);
                self.save(ctx)?;
            }
            "toggle-exercise" => {
                let id = action.param("id")?;
                let entry = self
                    .workouts
                    .day_mut(self.day)
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| AppError::invalid_action(format!("{id} is not in today's workout")))?;
                entry.completed = !entry.completed;
                self.save(ctx)?;
            }
            "clear-workout" => {
                self.workouts.day_mut(self.day).clear();
                self.last_added = None;
                self.save(ctx)?;
            }
            "undo-exercise" => {
                let Some((day, entry)) = self.last_added.take() else {
                    return Ok(());
                };
                let list = self.workouts.day_mut(day);
                if let Some(index) = list.iter().rposition(|e| e.id == entry.id && e.name == entry.name) {
                    list.remove(index);
                    self.save(ctx)?;
                }
            }
            "edit-exercise" => {
                let id = action.param("id")?;
                ctx.store.set_text(EDIT_EXERCISE_KEY, id)?;
                return Ok(());
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
    use crate::pages::catalog::{USER_AUTHOR, embedded_catalog};
    use crate::persistence::{DocumentStore, KeyValueStore, MemoryStore};
    use crate::platform::MemoryShell;
    use crate::router::PageId;
    use proptest::prelude::*;
    use std::rc::Rc;

    const PUSH_UPS: &str = "550e8400-e29b-41d4-a716-446655440001";

    fn ctx<'a>(store: &'a DocumentStore, bus: &'a EventBus, shell: &'a MemoryShell) -> PageContext<'a> {
        PageContext {
            page: PageId::Fitness,
            store,
            bus,
            shell,
        }
    }

    #[test]
    fn test_ab_sessions_are_merged_in_order() {
        let legacy = json!({
            "monday": { "A": [{ "id": "e1" }], "B": [{ "id": "e2" }] },
            "tuesday": { "B": [{ "id": "e3" }] },
            "friday": [{ "id": "e4" }]
        });
        let merged = merge_ab_sessions(legacy);
        assert_eq!(merged["monday"], json!([{ "id": "e1" }, { "id": "e2" }]));
        assert_eq!(merged["tuesday"], json!([{ "id": "e3" }]));
        assert_eq!(merged["friday"], json!([{ "id": "e4" }]));
    }

    #[test]
    fn test_extra_sessions_follow_a_and_b() {
        let legacy = json!({
            "monday": { "C": [{ "id": "e3" }], "B": [{ "id": "e2" }], "A": [{ "id": "e1" }], "note": "legs" }
        });
        let merged = merge_ab_sessions(legacy);
        assert_eq!(merged["monday"], json!([{ "id": "e1" }, { "id": "e2" }, { "id": "e3" }]));
    }

    #[test]
    fn test_blank_numbers_keep_every_workout_entry() {
        let backend = Rc::new(MemoryStore::new().with_item(
            "workouts",
            r#"{"monday":[{"id":"e1","name":"Push-ups","sets":3,"duration":300},{"id":"e2","name":"Plank","sets":null,"duration":null}],"tuesday":null}"#,
        ));
        let store = DocumentStore::new(backend.clone());
        let workouts: Workouts = store.load();
        let monday = workouts.day("monday");
        assert_eq!(monday.len(), 2);
        assert_eq!((monday[1].sets, monday[1].duration), (0, 0));
        assert!(workouts.day("tuesday").is_empty());

        let rewritten = backend.get_item("workouts").unwrap().unwrap();
        assert!(rewritten.contains("Plank"));
    }

    #[test]
    fn test_legacy_workouts_load_and_are_rewritten() {
        let backend = Rc::new(MemoryStore::new().with_item(
            "workouts",
            r#"{"monday":{"A":[{"id":"e1","name":"Push-ups","sets":3,"reps":"15"}],"B":[{"id":"e2","name":"Plank","reps":"45 sec"}]}}"#,
        ));
        let store = DocumentStore::new(backend.clone());
        let workouts: Workouts = store.load();
        let monday = workouts.day("monday");
        assert_eq!(monday.len(), 2);
        assert_eq!(monday[0].name, "Push-ups");
        assert_eq!(monday[1].reps, Some(Reps::Text("45 sec".into())));
        assert!(workouts.day("sunday").is_empty());

        let rewritten = backend.get_item("workouts").unwrap().unwrap();
        assert!(rewritten.contains(r#""version":1"#));
    }

    #[test]
    fn test_workout_flow() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessPage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("select-day").with("day", "wednesday"), &ctx).unwrap();
        page.handle(&PageAction::new("add-exercise").with("id", PUSH_UPS), &ctx).unwrap();
        page.handle(&PageAction::new("toggle-exercise").with("id", PUSH_UPS), &ctx).unwrap();

        let stored: Workouts = store.load();
        let wednesday = stored.day("wednesday");
        assert_eq!(wednesday.len(), 1);
        assert_eq!(wednesday[0].group, "chest");
        assert!(wednesday[0].completed);
        assert!(shell.slot("workoutsContainer").unwrap().contains("1/1"));

        page.handle(&PageAction::new("undo-exercise"), &ctx).unwrap();
        assert!(page.workouts().day("wednesday").is_empty());

        let err = page.handle(&PageAction::new("select-day").with("day", "someday"), &ctx);
        assert!(err.is_err());
        assert_eq!(page.active_day(), "wednesday");
    }

    #[test]
    fn test_custom_exercise_appears_once_across_activations() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessPage::new(embedded_catalog());
        page.init(&ctx).unwrap();
        assert_eq!(page.exercises().len(), 6);

        let custom = CatalogExercise {
            id: "c-1".into(),
            name: "Dead Bug".into(),
            category: "Core".into(),
            created_by: USER_AUTHOR.into(),
            ..Default::default()
        };
        store.save(&CustomExercises(vec![custom])).unwrap();

        page.reinit(&ctx).unwrap();
        page.reinit(&ctx).unwrap();
        assert_eq!(page.exercises().len(), 7);
        assert_eq!(page.exercises().iter().filter(|e| e.id == "c-1").count(), 1);
        assert_eq!(shell.slot("fitnessExercisesList").unwrap().matches("Dead Bug").count(), 1);
    }

    #[test]
    fn test_edit_exercise_hands_off_id() {
        let store = DocumentStore::in_memory();
        let bus = EventBus::new();
        let shell = MemoryShell::new();
        let ctx = ctx(&store, &bus, &shell);
        let mut page = FitnessPage::new(embedded_catalog());
        page.init(&ctx).unwrap();

        page.handle(&PageAction::new("edit-exercise").with("id", PUSH_UPS), &ctx).unwrap();
        assert_eq!(store.get_text(EDIT_EXERCISE_KEY).as_deref(), Some(PUSH_UPS));
    }

    #[test]
    fn test_summary_percent() {
        let done = WorkoutEntry {
            completed: true,
            duration: 90,
            ..Default::default()
        };
        let todo = WorkoutEntry::default();
        let summary = WorkoutSummary::of(&[done.clone(), todo.clone(), todo]);
        assert_eq!(summary.percent(), 33);
        assert_eq!(summary.minutes, 2);
        assert_eq!(WorkoutSummary::of(&[]).percent(), 0);
    }

    fn entry_value() -> impl Strategy<Value = Value> {
        "[a-z]{1,4}".prop_map(|id| json!({ "id": id }))
    }

    fn day_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            prop::collection::vec(entry_value(), 0..3).prop_map(Value::Array),
            (
                prop::collection::vec(entry_value(), 0..3),
                prop::collection::vec(entry_value(), 0..3)
            )
                .prop_map(|(a, b)| json!({ "A": a, "B": b })),
        ]
    }

    proptest! {
        #[test]
        fn prop_session_merge_is_idempotent(
            days in prop::collection::btree_map("[a-z]{3,9}", day_value(), 0..7)
        ) {
            let input = Value::Object(days.into_iter().collect());
            let once = merge_ab_sessions(input);
            prop_assert_eq!(merge_ab_sessions(once.clone()), once);
        }
    }
}
