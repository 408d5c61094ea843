//! Nutrition page: a seven-day meal planner with three meals per day,
//! daily macro totals and progress against macro goals

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::foods::{FOOD_GROUPS, Food, FoodList};
use super::{filter_buttons, format_number, parse_numeric, unknown_action};
use crate::error::AppError;
use crate::events::topics;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::persistence::StoredDocument;
use crate::platform::escape_html;

const FILTER_KEY: &str = "nutritionFilter";
pub const DAYS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSlot {
    Meal1,
    Meal2,
    Meal3,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Meal1, MealSlot::Meal2, MealSlot::Meal3];

    pub fn key(&self) -> &'static str {
        match self {
            MealSlot::Meal1 => "meal1",
            MealSlot::Meal2 => "meal2",
            MealSlot::Meal3 => "meal3",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            MealSlot::Meal1 => 1,
            MealSlot::Meal2 => 2,
            MealSlot::Meal3 => 3,
        }
    }

    /// Text preference remembering whether the meal panel is collapsed
    pub fn collapsed_key(&self) -> String {
        format!("{}Collapsed", self.key())
    }

    /// Accepts `meal2` or `2`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.key() == s || m.number().to_string() == s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealItem {
    pub id: u32,
    pub name: String,
    pub size: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl From<&Food> for MealItem {
    fn from(food: &Food) -> Self {
        Self {
            id: food.id,
            name: food.name.clone(),
            size: food.size.clone(),
            calories: food.calories,
            protein: parse_numeric(&food.protein),
            carbs: parse_numeric(&food.carbs),
            fats: parse_numeric(&food.fats),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayMeals {
    pub meal1: Vec<MealItem>,
    pub meal2: Vec<MealItem>,
    pub meal3: Vec<MealItem>,
}

impl DayMeals {
    pub fn meal(&self, slot: MealSlot) -> &[MealItem] {
        match slot {
            MealSlot::Meal1 => &self.meal1,
            MealSlot::Meal2 => &self.meal2,
            MealSlot::Meal3 => &self.meal3,
        }
    }

    fn meal_mut(&mut self, slot: MealSlot) -> &mut Vec<MealItem> {
        match slot {
            MealSlot::Meal1 => &mut self.meal1,
            MealSlot::Meal2 => &mut self.meal2,
            MealSlot::Meal3 => &mut self.meal3,
        }
    }

    pub fn totals(&self) -> MacroTotals {
        MealSlot::ALL
            .into_iter()
            .map(|slot| MacroTotals::of(self.meal(slot)))
            .fold(MacroTotals::default(), |acc, t| acc + t)
    }
}

/// Meals for `day1` through `day7`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekMeals {
    pub day1: DayMeals,
    pub day2: DayMeals,
    pub day3: DayMeals,
    pub day4: DayMeals,
    pub day5: DayMeals,
    pub day6: DayMeals,
    pub day7: DayMeals,
}

impl WeekMeals {
    /// `day` is 1-based; out-of-range days read as day 1
    pub fn day(&self, day: u8) -> &DayMeals {
        match day {
            2 => &self.day2,
            3 => &self.day3,
            4 => &self.day4,
            5 => &self.day5,
            6 => &self.day6,
            7 => &self.day7,
            _ => &self.day1,
        }
    }

    pub fn day_mut(&mut self, day: u8) -> &mut DayMeals {
        match day {
            2 => &mut self.day2,
            3 => &mut self.day3,
            4 => &mut self.day4,
            5 => &mut self.day5,
            6 => &mut self.day6,
            7 => &mut self.day7,
            _ => &mut self.day1,
        }
    }
}

impl StoredDocument for WeekMeals {
    const KEY: &'static str = "weekMeals";

    fn default_document() -> Self {
        Self::default()
    }
}

/// Daily macro targets, stored under `goals`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroGoals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Default for MacroGoals {
    fn default() -> Self {
        Self {
            calories: 2500.0,
            protein: 180.0,
            carbs: 250.0,
            fats: 80.0,
        }
    }
}

impl StoredDocument for MacroGoals {
    const KEY: &'static str = "goals";

    fn default_document() -> Self {
        Self::default()
    }
}

impl MacroGoals {
    /// Blank, zero or unparsable fields fall back to the default target
    pub fn from_action(action: &PageAction) -> Self {
        let defaults = Self::default();
        let field = |key: &str, default: f64| {
            action
                .optional(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default)
        };
        Self {
            calories: field("calories", defaults.calories),
            protein: field("protein", defaults.protein),
            carbs: field("carbs", defaults.carbs),
            fats: field("fats", defaults.fats),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl MacroTotals {
    pub fn of(items: &[MealItem]) -> Self {
        items.iter().fold(Self::default(), |acc, item| Self {
            calories: acc.calories + item.calories,
            protein: acc.protein + item.protein,
            carbs: acc.carbs + item.carbs,
            fats: acc.fats + item.fats,
        })
    }
}

impl std::ops::Add for MacroTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fats: self.fats + rhs.fats,
        }
    }
}

/// Percentage of `goal` reached, capped at 100
pub fn progress_percent(actual: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    (actual / goal * 100.0).min(100.0)
}

pub struct NutritionPage {
    week: WeekMeals,
    goals: MacroGoals,
    foods: FoodList,
    day: u8,
    active_meal: MealSlot,
    last_added: Option<(u8, MealSlot, MealItem)>,
    filter: String,
    /// Indexed by meal number - 1
    collapsed: [bool; 3],
}

impl Default for NutritionPage {
    fn default() -> Self {
        Self::new()
    }
}

impl NutritionPage {
    pub fn new() -> Self {
        Self {
            week: WeekMeals::default(),
            goals: MacroGoals::default(),
            foods: FoodList::default(),
            day: 1,
            active_meal: MealSlot::Meal1,
            last_added: None,
            filter: "all".to_string(),
            collapsed: [false; 3],
        }
    }

    pub fn week(&self) -> &WeekMeals {
        &self.week
    }

    pub fn current_day(&self) -> u8 {
        self.day
    }

    pub fn today(&self) -> &DayMeals {
        self.week.day(self.day)
    }

    pub fn is_collapsed(&self, slot: MealSlot) -> bool {
        self.collapsed[usize::from(slot.number() - 1)]
    }

    fn load(&mut self, ctx: &PageContext<'_>) {
        self.week = ctx.store.load();
        self.goals = ctx.store.load();
        self.foods = ctx.store.load();
        self.filter = ctx.store.get_text(FILTER_KEY).unwrap_or_else(|| "all".to_string());
        for slot in MealSlot::ALL {
            self.collapsed[usize::from(slot.number() - 1)] =
                ctx.store.get_text(&slot.collapsed_key()).as_deref() == Some("true");
        }
        self.render(ctx);
    }

    fn render(&self, ctx: &PageContext<'_>) {
        ctx.render("dayTabs", &self.render_days());
        ctx.render("mealsContainer", &self.render_meals());
        ctx.render("nutritionFoodsList", &self.render_foods());
        ctx.render("nutritionSummary", &self.render_summary());
        let mut options = vec![("all", "All")];
        options.extend(FOOD_GROUPS);
        ctx.render("nutritionFilter", &filter_buttons("filter-foods", &options, &self.filter));
    }

    fn render_days(&self) -> String {
        (1..=DAYS)
            .map(|day| {
                let class = if day == self.day { " active" } else { "" };
                format!(r#"<button class="day-btn{class}" data-action="select-day" data-day="{day}">Day {day}</button>"#)
            })
            .collect()
    }

    fn render_meals(&self) -> String {
        let today = self.today();
        let mut html = String::new();
        for slot in MealSlot::ALL {
            let n = slot.number();
            let items = today.meal(slot);
            let totals = MacroTotals::of(items);
            let checked = if slot == self.active_meal { " checked" } else { "" };
            let (toggle, chevron, display) = if self.is_collapsed(slot) {
                ("Expand", "down", "none")
            } else {
                ("Collapse", "up", "block")
            };
            html.push_str(&format!(
                r#"<div class="meal-card"><div class="meal-header"><input type="radio" name="activeMeal" value="{n}" data-action="select-meal" data-meal="{n}"{checked}><span>Meal {n}</span><span class="meal-total-summary">{} cal • {}g P • {}g C • {}g F</span><button class="btn btn-light btn-sm action-btn meal-toggle-btn" data-action="toggle-meal" data-meal="{n}" title="{toggle} meal details"><i class="bi bi-chevron-{chevron} text-primary fs-6"></i></button></div><div class="meal-content" id="mealContent{n}" style="display: {display}">"#,
                format_number(totals.calories),
                format_number(totals.protein),
                format_number(totals.carbs),
                format_number(totals.fats),
            ));
            if items.is_empty() {
                html.push_str(r#"<div class="meal-empty">No foods added yet. Select items from the food list.</div>"#);
            }
            for item in items {
                html.push_str(&format!(
                    r#"<div class="meal-item"><div class="food-name">{} ({})</div><div class="macro-value">{}</div><div class="macro-value">{}g</div><div class="macro-value">{}g</div><div class="macro-value">{}g</div><button class="btn btn-light btn-sm action-btn delete-btn" data-action="remove-from-meal" data-meal="{}" data-id="{}" title="Remove from Meal"><i class="bi bi-trash3 text-danger fs-6"></i></button></div>"#,
                    escape_html(&item.name),
                    escape_html(&item.size),
                    item.calories,
                    item.protein,
                    item.carbs,
                    item.fats,
                    slot.key(),
                    item.id,
                ));
            }
            html.push_str("</div></div>");
        }
        if self.last_added.is_some() {
            html.push_str(r#"<button class="btn-undo" data-action="undo-add">Undo Last Add</button>"#);
        }
        html
    }

    fn render_foods(&self) -> String {
        let item = |food: &Food| {
            format!(
                r#"<div class="nutrition-food-item-grid" data-food-id="{id}"><div class="food-name-cell">{} ({})</div><div class="food-macro-cell">{}</div><div class="food-macro-cell">{}</div><div class="food-macro-cell">{}</div><div class="food-macro-cell">{}</div><button class="btn btn-success btn-sm action-btn add-btn" data-action="add-to-meal" data-id="{id}" title="Add to Meal"><i class="bi bi-plus-circle text-white fs-6"></i></button></div>"#,
                escape_html(&food.name),
                escape_html(&food.size),
                food.calories,
                escape_html(&food.protein),
                escape_html(&food.carbs),
                escape_html(&food.fats),
                id = food.id,
            )
        };

        if self.filter != "all" {
            let html: String = self.foods.in_group(&self.filter).map(item).collect();
            if html.is_empty() {
                return r#"<div class="empty-state">No foods in this group.</div>"#.to_string();
            }
            return html;
        }

        let mut html = String::new();
        for (group, label) in [("protein", "Proteins"), ("carb", "Carbs"), ("fat", "Fats"), ("mixed", "Mixed"), ("drinks", "Drinks")] {
            let items: String = self.foods.in_group(group).map(item).collect();
            if !items.is_empty() {
                html.push_str(&format!(
                    r#"<div class="food-group-section"><h6 class="food-group-title">{label}</h6><div class="food-group-items">{items}</div></div>"#
                ));
            }
        }
        if html.is_empty() {
            html.push_str(r#"<div class="empty-state">No foods available.</div>"#);
        }
        html
    }

    fn render_summary(&self) -> String {
        let totals = self.today().totals();
        let goals = self.goals;
        let pct = progress_percent(totals.calories, goals.calories);
        let bar = |label: &str, actual: f64, goal: f64| {
            format!(
                r#"<div class="macro-row"><span>{label}</span><span>{}g / {}g</span><div class="macro-bar"><div class="macro-fill" style="width: {:.0}%"></div></div></div>"#,
                format_number(actual),
                format_number(goal),
                progress_percent(actual, goal)
            )
        };
        format!(
            r#"<div class="progress-summary"><div id="progressText">{} / {} kcal ({:.0}%)</div><div class="progress-bar"><div id="progressFill" class="progress-fill" style="width: {pct:.0}%"></div></div>{}{}{}<button class="btn-clear" data-action="clear-day">Clear Day</button></div>"#,
            format_number(totals.calories),
            format_number(goals.calories),
            pct,
            bar("Protein", totals.protein, goals.protein),
            bar("Carbs", totals.carbs, goals.carbs),
            bar("Fats", totals.fats, goals.fats),
        )
    }

    fn save_meals(&self, ctx: &PageContext<'_>) -> Result<(), AppError> {
        ctx.store.save(&self.week)?;
        ctx.publish(topics::MEALS_UPDATED, &json!({ "day": self.day }));
        Ok(())
    }

    fn meal_param(action: &PageAction) -> Result<MealSlot, AppError> {
        let raw = action.param("meal")?;
        MealSlot::parse(raw).ok_or_else(|| AppError::invalid_action(format!("unknown meal `{raw}`")))
    }
}

impl PageModule for NutritionPage {
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
                let day: u8 = action.parse("day")?;
                if !(1..=DAYS).contains(&day) {
                    return Err(AppError::invalid_action(format!("no day {day}")));
                }
                self.day = day;
            }
            "select-meal" => {
                self.active_meal = Self::meal_param(action)?;
            }
            "add-to-meal" => {
                let id: u32 = action.parse("id")?;
                let food = self
                    .foods
                    .get(id)
                    .ok_or_else(|| AppError::invalid_action(format!("no food with id {id}")))?;
                let item = MealItem::from(food);
                let slot = self.active_meal;
                self.week.day_mut(self.day).meal_mut(slot).push(item.clone());
                self.last_added = Some((self.day, slot, item));
                self.save_meals(ctx)?;
            }
            "remove-from-meal" => {
                let slot = Self::meal_param(action)?;
                let id: u32 = action.parse("id")?;
                self.week.day_mut(self.day).meal_mut(slot).retain(|item| item.id != id);
                self.save_meals(ctx)?;
            }
            "clear-day" => {
                *self.week.day_mut(self.day) = DayMeals::default();
                self.last_added = None;
                self.save_meals(ctx)?;
            }
            "undo-add" => {
                let Some((day, slot, item)) = self.last_added.take() else {
                    return Ok(());
                };
                let meal = self.week.day_mut(day).meal_mut(slot);
                if let Some(index) = meal.iter().rposition(|m| m.id == item.id && m.name == item.name) {
                    meal.remove(index);
                    self.save_meals(ctx)?;
                }
            }
            "set-goals" => {
                self.goals = MacroGoals::from_action(action);
                ctx.store.save(&self.goals)?;
            }
            "toggle-meal" => {
                let slot = Self::meal_param(action)?;
                let collapsed = &mut self.collapsed[usize::from(slot.number() - 1)];
                *collapsed = !*collapsed;
                let value = if *collapsed { "true" } else { "false" };
                if let Err(err) = ctx.store.set_text(&slot.collapsed_key(), value) {
                    log::warn!("Could not remember meal panel state: {err}");
                }
            }
            "filter-foods" => {
                self.filter = action.param("group")?.to_string();
                if let Err(err) = ctx.store.set_text(FILTER_KEY, &self.filter) {
                    log::warn!("Could not remember nutrition filter: {err}");
                }
            }
            other => return Err(unknown_action(ctx.page, other)),
        }
        self.render(ctx);
        Ok(())
    }
}
