//! Foods page: the food catalog used by the nutrition planner

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{filter_buttons, unknown_action};
use crate::error::AppError;
use crate::events::topics;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::persistence::{SchemaMigrator, StoredDocument};
use crate::platform::escape_html;

/// Filter key and label for every food group
pub const FOOD_GROUPS: [(&str, &str); 5] = [
    ("protein", "Protein"),
    ("carb", "Carb"),
    ("fat", "Fat"),
    ("mixed", "Mixed"),
    ("drinks", "Drinks"),
];

const DEFAULT_GROUP: &str = "mixed";

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

pub fn group_label(group: &str) -> &'static str {
    FOOD_GROUPS
        .iter()
        .find(|(key, _)| *key == group)
        .map_or("Mixed", |(_, label)| label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: u32,
    pub name: String,
    pub size: String,
    pub calories: f64,
    /// Macros keep their unit, e.g. `"62g"`
    pub protein: String,
    pub carbs: String,
    pub fats: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub selected: bool,
}

impl Food {
    #[allow(clippy::too_many_arguments)]
    fn catalog(
        id: u32,
        name: &str,
        size: &str,
        calories: f64,
        protein: &str,
        carbs: &str,
        fats: &str,
        group: &str,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            size: size.to_string(),
            calories,
            protein: protein.to_string(),
            carbs: carbs.to_string(),
            fats: fats.to_string(),
            group: group.to_string(),
            selected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoodList(pub Vec<Food>);

impl Default for FoodList {
    fn default() -> Self {
        Self(vec![
            Food::catalog(1, "Chicken Breast", "200g", 330.0, "62g", "0g", "7g", "protein"),
            Food::catalog(2, "Salmon", "180g", 367.0, "56g", "0g", "14g", "protein"),
            Food::catalog(3, "Brown Rice", "150g cooked", 216.0, "5g", "45g", "2g", "carb"),
            Food::catalog(4, "Sweet Potato", "200g baked", 172.0, "4g", "39g", "0g", "carb"),
            Food::catalog(5, "Avocado", "100g", 160.0, "2g", "9g", "15g", "fat"),
            Food::catalog(6, "Greek Yogurt", "200g plain", 130.0, "20g", "9g", "0g", "protein"),
            Food::catalog(7, "Almonds", "30g (24 nuts)", 174.0, "6g", "6g", "15g", "mixed"),
            Food::catalog(8, "Broccoli", "100g steamed", 34.0, "3g", "7g", "0g", "carb"),
            Food::catalog(9, "Banana", "120g medium", 107.0, "1g", "27g", "0g", "carb"),
            Food::catalog(10, "Spinach", "50g fresh", 12.0, "1g", "2g", "0g", "carb"),
            Food::catalog(11, "Eggs", "2 large", 140.0, "12g", "1g", "10g", "mixed"),
            Food::catalog(12, "Oats", "50g dry", 190.0, "7g", "32g", "4g", "carb"),
            Food::catalog(13, "Water", "250ml", 0.0, "0g", "0g", "0g", "drinks"),
            Food::catalog(14, "Coffee", "240ml", 2.0, "0g", "0g", "0g", "drinks"),
            Food::catalog(15, "Orange Juice", "250ml", 110.0, "2g", "26g", "0g", "drinks"),
        ])
    }
}

/// v0 -> v1: foods saved before groups existed become `mixed`
fn fill_missing_groups(data: Value) -> Value {
    let Value::Array(foods) = data else {
        return data;
    };
    Value::Array(
        foods
            .into_iter()
            .map(|mut food| {
                if let Some(obj) = food.as_object_mut() {
                    let has_group = obj
                        .get("group")
                        .and_then(Value::as_str)
                        .is_some_and(|g| !g.is_empty());
                    if !has_group {
                        obj.insert("group".to_string(), json!(DEFAULT_GROUP));
                    }
                }
                food
            })
            .collect(),
    )
}

impl StoredDocument for FoodList {
    const KEY: &'static str = "foods";

    fn default_document() -> Self {
        Self::default()
    }

    fn migrator() -> SchemaMigrator {
        SchemaMigrator::new(Self::VERSION).with_step(0, "fill missing food groups", fill_missing_groups)
    }
}

/// Validated form input for a new or edited food
#[derive(Debug, Clone, PartialEq)]
pub struct FoodInput {
    pub name: String,
    pub size: String,
    pub calories: f64,
    pub protein: String,
    pub carbs: String,
    pub fats: String,
    pub group: String,
}

/// Bare numbers get the gram suffix the catalog uses
fn normalize_macro(value: &str) -> String {
    let value = value.trim();
    if !value.is_empty() && value.parse::<f64>().is_ok() {
        format!("{value}g")
    } else {
        value.to_string()
    }
}

impl FoodInput {
    pub fn from_action(action: &PageAction) -> Result<Self, AppError> {
        let required = |key: &str| {
            action
                .optional(key)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| AppError::invalid_action(format!("{}: `{key}` is required", action.name)))
        };

        let calories: f64 = action.parse("calories")?;
        if !calories.is_finite() || calories < 0.0 {
            return Err(AppError::invalid_action(format!(
                "{}: calories must be zero or more",
                action.name
            )));
        }
        let group = required("group")?;
        if !FOOD_GROUPS.iter().any(|(key, _)| *key == group) {
            return Err(AppError::invalid_action(format!("unknown food group `{group}`")));
        }

        Ok(Self {
            name: required("name")?,
            size: required("size")?,
            calories,
            protein: normalize_macro(&required("protein")?),
            carbs: normalize_macro(&required("carbs")?),
            fats: normalize_macro(&required("fats")?),
            group,
        })
    }
}

impl FoodList {
    pub fn get(&self, id: u32) -> Option<&Food> {
        self.0.iter().find(|f| f.id == id)
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Food, AppError> {
        self.0
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::invalid_action(format!("no food with id {id}")))
    }

    pub fn next_id(&self) -> u32 {
        self.0.iter().map(|f| f.id).max().map_or(1, |max| max + 1)
    }

    pub fn add(&mut self, input: FoodInput) -> u32 {
        let id = self.next_id();
        self.0.push(Food {
            id,
            name: input.name,
            size: input.size,
            calories: input.calories,
            protein: input.protein,
            carbs: input.carbs,
            fats: input.fats,
            group: input.group,
            selected: false,
        });
        id
    }

    pub fn update(&mut self, id: u32, input: FoodInput) -> Result<(), AppError> {
        let food = self.get_mut(id)?;
        food.name = input.name;
        food.size = input.size;
        food.calories = input.calories;
        food.protein = input.protein;
        food.carbs = input.carbs;
        food.fats = input.fats;
        food.group = input.group;
        Ok(())
    }

    pub fn remove(&mut self, id: u32) -> Result<Food, AppError> {
        let index = self
            .0
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| AppError::invalid_action(format!("no food with id {id}")))?;
        Ok(self.0.remove(index))
    }

    pub fn toggle_selected(&mut self, id: u32) -> Result<bool, AppError> {
        let food = self.get_mut(id)?;
        food.selected = !food.selected;
        Ok(food.selected)
    }

    /// Foods in `group`, or all of them for `"all"`
    pub fn in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Food> + 'a {
        self.0.iter().filter(move |f| group == "all" || f.group == group)
    }
}

pub struct FoodsPage {
    foods: FoodList,
    filter: String,
    search: String,
}

impl Default for FoodsPage {
    fn default() -> Self {
        Self::new()
    }
}

impl FoodsPage {
    pub fn new() -> Self {
        Self {
            foods: FoodList::default(),
            filter: "all".to_string(),
            search: String::new(),
        }
    }

    pub fn foods(&self) -> &FoodList {
        &self.foods
    }

    fn render(&self, ctx: &PageContext<'_>) {
        let mut options = vec![("all", "All")];
        options.extend(FOOD_GROUPS);
        ctx.render("foodsFilter", &filter_buttons("filter-foods", &options, &self.filter));

        let search = self.search.to_lowercase();
        let rows: String = self
            .foods
            .in_group(&self.filter)
            .filter(|f| search.is_empty() || f.name.to_lowercase().contains(&search))
            .map(|food| {
                let checked = if food.selected { " checked" } else { "" };
                format!(
                    r#"<div class="food-row" data-food-id="{id}"><input type="checkbox" class="food-checkbox" data-action="toggle-food" data-id="{id}"{checked}><div class="food-name">{name}</div><div class="food-size">{size}</div><div class="macro-value">{calories}</div><div class="macro-value">{protein}</div><div class="macro-value">{carbs}</div><div class="macro-value">{fats}</div><div class="group-badge group-{group}">{label}</div><div class="action-buttons"><button class="btn btn-light btn-sm action-btn delete-btn" data-action="delete-food" data-id="{id}" title="Delete Food"><i class="bi bi-trash3 text-danger fs-6"></i></button></div></div>"#,
                    id = food.id,
                    name = escape_html(&food.name),
                    size = escape_html(&food.size),
                    calories = food.calories,
                    protein = escape_html(&food.protein),
                    carbs = escape_html(&food.carbs),
                    fats = escape_html(&food.fats),
                    group = escape_html(&food.group),
                    label = group_label(&food.group),
                )
            })
            .collect();
        ctx.render("foodsTableBody", &rows);
    }

    fn load(&mut self, ctx: &PageContext<'_>) {
        self.foods = ctx.store.load();
        self.render(ctx);
    }
}

impl PageModule for FoodsPage {
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
            "filter-foods" => {
                self.filter = action.param("group")?.to_string();
                self.render(ctx);
                return Ok(());
            }
            "search-foods" => {
                self.search = action.params.get("value").cloned().unwrap_or_default();
                self.render(ctx);
                return Ok(());
            }
            "add-food" => {
                let id = self.foods.add(FoodInput::from_action(action)?);
                log::debug!("Added food {id}");
            }
            "edit-food" => {
                let input = FoodInput::from_action(action)?;
                self.foods.update(action.parse("id")?, input)?;
            }
            "delete-food" => {
                self.foods.remove(action.parse("id")?)?;
            }
            "toggle-food" => {
                self.foods.toggle_selected(action.parse("id")?)?;
            }
            other => return Err(unknown_action(ctx.page, other)),
        }

        ctx.store.save(&self.foods)?;
        self.render(ctx);
        ctx.publish(topics::FOODS_UPDATED, &json!({ "count": self.foods.0.len() }));
        Ok(())
    }
}
