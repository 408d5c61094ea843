//! Whole-app flows: real page modules behind the loader, headless shell,
//! in-memory storage shared across simulated reloads

use std::rc::Rc;

use futures::executor::block_on;

use wellness_app::persistence::{KeyValueStore, MemoryStore};
use wellness_app::platform::{MemoryShell, StaticSource};
use wellness_app::{
    BuiltinModules, DocumentStore, EventBus, NavigationOutcome, PageAction, PageId, PageLoader,
    Router,
};

const CATALOG_PATH: &str = "data/exercises.json";
const CATALOG: &str = include_str!("../data/exercises.json");

struct App {
    loader: PageLoader,
    shell: Rc<MemoryShell>,
    fragments: Rc<StaticSource>,
}

impl App {
    /// A fresh page load over `backend`
    fn boot(backend: &Rc<MemoryStore>) -> Self {
        let router = Router::default();
        let fragments = Rc::new(StaticSource::new().with(CATALOG_PATH, CATALOG));
        for page in PageId::ALL {
            fragments.insert(
                &router.route(page).fragment_path,
                &format!(r#"<section id="{page}-page"></section>"#),
            );
        }
        let shell = Rc::new(MemoryShell::new());
        let modules = Rc::new(BuiltinModules::new(fragments.clone(), CATALOG_PATH));
        let loader = PageLoader::new(
            router,
            Rc::new(DocumentStore::new(backend.clone())),
            Rc::new(EventBus::new()),
            shell.clone(),
            fragments.clone(),
            modules,
        );
        Self {
            loader,
            shell,
            fragments,
        }
    }

    fn go(&self, page: PageId) -> NavigationOutcome {
        block_on(self.loader.navigate_to(page)).unwrap()
    }

    fn act(&self, action: PageAction) {
        assert_eq!(self.loader.dispatch(&action), Ok(true), "{}", action.name);
    }

    fn slot(&self, slot: &str) -> String {
        self.shell.slot(slot).unwrap_or_default()
    }
}

fn dead_bug_form() -> PageAction {
    PageAction::new("create-exercise")
        .with("name", "Dead Bug")
        .with("category", "Core")
        .with("equipment", "Bodyweight")
        .with("difficulty", "Beginner")
        .with("primary_muscle", "Abs")
        .with("sets", 3)
        .with("reps", 12)
        .with("duration", 120)
}

#[test]
fn test_custom_exercise_listed_once_across_visits_and_reloads() {
    let backend = Rc::new(MemoryStore::new());
    let app = App::boot(&backend);

    app.go(PageId::FitnessTable);
    app.act(dead_bug_form());
    assert_eq!(app.slot("exerciseTableBody").matches("Dead Bug").count(), 1);

    app.go(PageId::Fitness);
    assert_eq!(app.slot("fitnessExercisesList").matches("Dead Bug").count(), 1);
    app.go(PageId::FitnessTable);
    assert_eq!(
        app.go(PageId::Fitness),
        NavigationOutcome::Reinitialized(PageId::Fitness)
    );
    assert_eq!(app.slot("fitnessExercisesList").matches("Dead Bug").count(), 1);

    let reloaded = App::boot(&backend);
    reloaded.go(PageId::Fitness);
    assert_eq!(reloaded.slot("fitnessExercisesList").matches("Dead Bug").count(), 1);
}

#[test]
fn test_navigating_to_current_page_fetches_nothing() {
    let app = App::boot(&Rc::new(MemoryStore::new()));
    app.go(PageId::Wellness);
    let fetches = app.fragments.fetch_count();
    let injections = app.shell.injections();

    assert_eq!(
        app.go(PageId::Wellness),
        NavigationOutcome::Unchanged(PageId::Wellness)
    );
    assert_eq!(app.fragments.fetch_count(), fetches);
    assert_eq!(app.shell.injections(), injections);
}

#[test]
fn test_food_added_on_foods_page_is_offered_by_nutrition() {
    let backend = Rc::new(MemoryStore::new());
    let app = App::boot(&backend);

    app.go(PageId::Nutrition);
    assert!(!app.slot("nutritionFoodsList").contains("Lentils"));

    app.go(PageId::Foods);
    app.act(
        PageAction::new("add-food")
            .with("name", "Lentils")
            .with("size", "100g cooked")
            .with("calories", 116)
            .with("protein", 9)
            .with("carbs", 20)
            .with("fats", 0.4)
            .with("group", "protein"),
    );
    assert!(app.slot("foodsTableBody").contains("Lentils"));

    app.go(PageId::Nutrition);
    assert!(app.slot("nutritionFoodsList").contains("Lentils"));
    app.act(PageAction::new("add-to-meal").with("id", 16));
    assert!(app.slot("mealsContainer").contains("Lentils (100g cooked)"));
}

#[test]
fn test_meal_plan_survives_reload() {
    let backend = Rc::new(MemoryStore::new());
    let app = App::boot(&backend);
    app.go(PageId::Nutrition);
    app.act(PageAction::new("add-to-meal").with("id", 1));
    assert!(app.slot("nutritionSummary").contains("330 / 2,500 kcal"));

    let reloaded = App::boot(&backend);
    reloaded.go(PageId::Nutrition);
    assert!(reloaded.slot("nutritionSummary").contains("330 / 2,500 kcal"));
}

#[test]
fn test_legacy_documents_are_upgraded_on_first_visit() {
    let backend = Rc::new(
        MemoryStore::new()
            .with_item("goals_nutrition", r#"["Eat more greens"]"#)
            .with_item(
                "workouts",
                r#"{"monday":{"A":[{"id":"a","name":"Bench Press","sets":3}],"B":[{"id":"b","name":"Rowing","sets":4}]}}"#,
            ),
    );
    let app = App::boot(&backend);

    app.go(PageId::Goals);
    assert!(app.slot("nutritionGoalsList").contains("Eat more greens"));

    app.go(PageId::Fitness);
    let workout = app.slot("workoutsContainer");
    let bench = workout.find("Bench Press").unwrap();
    let rowing = workout.find("Rowing").unwrap();
    assert!(bench < rowing);

    let stored = backend.get_item("workouts").unwrap().unwrap();
    assert!(stored.contains(r#""version":1"#));
    assert!(!stored.contains(r#""A":"#));
}

#[test]
fn test_edit_button_hands_exercise_to_table_page() {
    let app = App::boot(&Rc::new(MemoryStore::new()));
    app.go(PageId::Fitness);

    let edit = PageAction::new("edit-exercise")
        .with("id", "550e8400-e29b-41d4-a716-446655440004")
        .with("navigate", "fitness-table");
    let next = app.loader.route_action(&edit).unwrap();
    assert_eq!(next.as_deref(), Some("fitness-table"));

    block_on(app.loader.navigate("fitness-table")).unwrap();
    assert!(app.slot("editExerciseForm").contains(r#"value="Plank""#));
}

#[test]
fn test_bad_action_leaves_page_usable() {
    let app = App::boot(&Rc::new(MemoryStore::new()));
    app.go(PageId::Wellness);

    let err = app
        .loader
        .dispatch(&PageAction::new("set-energy").with("value", 42));
    assert!(err.is_err());
    app.act(PageAction::new("set-energy").with("value", 9));
    assert!(app.slot("energyValue").contains("<span>9</span>"));
}

#[test]
fn test_deleted_catalog_exercise_stays_gone_until_next_boot() {
    let backend = Rc::new(MemoryStore::new());
    let app = App::boot(&backend);
    app.go(PageId::FitnessTable);
    let rows = |app: &App| app.slot("exerciseTableBody").matches("exercise-row").count();
    assert_eq!(rows(&app), 6);

    app.act(PageAction::new("delete-exercise").with("id", "550e8400-e29b-41d4-a716-446655440001"));
    assert_eq!(rows(&app), 5);
    assert!(!app.slot("exerciseTableBody").contains("Push-ups"));

    app.go(PageId::Fitness);
    app.go(PageId::FitnessTable);
    assert_eq!(rows(&app), 5);

    let reloaded = App::boot(&backend);
    reloaded.go(PageId::FitnessTable);
    assert_eq!(rows(&reloaded), 6);
}

#[test]
fn test_blank_numbers_in_stored_exercises_and_workouts_are_kept() {
    let backend = Rc::new(
        MemoryStore::new()
            .with_item(
                "custom-exercises",
                r#"[{"id":"c-1","name":"Dead Bug","category":"Core","sets":3,"duration":120,"created_by":"User"},
                    {"id":"c-2","name":"Bird Dog","category":"Core","sets":null,"duration":null,"calories_per_minute":null,"created_by":"User"}]"#,
            )
            .with_item(
                "workouts",
                r#"{"monday":[{"id":"c-1","name":"Dead Bug","sets":3,"duration":120},{"id":"c-2","name":"Bird Dog","sets":null,"duration":null}]}"#,
            ),
    );
    let app = App::boot(&backend);

    app.go(PageId::Fitness);
    let list = app.slot("fitnessExercisesList");
    assert!(list.contains("Dead Bug"));
    assert!(list.contains("Bird Dog"));
    let workout = app.slot("workoutsContainer");
    assert!(workout.contains("Bird Dog"));
    assert!(workout.contains("0/2"));

    let stored = backend.get_item("custom-exercises").unwrap().unwrap();
    assert!(stored.contains("Bird Dog"));
}
