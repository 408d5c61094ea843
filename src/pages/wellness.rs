//! Wellness page: daily habits, mood, energy level and tracked metrics

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::unknown_action;
use crate::error::AppError;
use crate::loader::{PageAction, PageContext, PageModule};
use crate::persistence::StoredDocument;
use crate::platform::escape_html;

pub const ENERGY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: u32,
    pub name: String,
    pub completed: bool,
}

impl Habit {
    fn new(id: u32, name: &str, completed: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Great,
    Good,
    Okay,
    Low,
    Stressed,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Great, Mood::Good, Mood::Okay, Mood::Low, Mood::Stressed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Great => "great",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
            Mood::Stressed => "stressed",
        }
    }

    fn emoji(&self) -> &'static str {
        match self {
            Mood::Great => "😄",
            Mood::Good => "🙂",
            Mood::Okay => "😐",
            Mood::Low => "😔",
            Mood::Stressed => "😫",
        }
    }
}

impl FromStr for Mood {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::invalid_action(format!("unknown mood `{s}`")))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Hours
    pub sleep: f64,
    /// Minutes
    pub meditation: u32,
    /// Glasses
    pub water: u32,
    /// Minutes
    pub reading: u32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            sleep: 8.0,
            meditation: 15,
            water: 6,
            reading: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessData {
    pub habits: Vec<Habit>,
    pub mood: Mood,
    pub energy: u8,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Default for WellnessData {
    fn default() -> Self {
        Self {
            habits: vec![
                Habit::new(1, "Morning Meditation", true),
                Habit::new(2, "Drink 8 Glasses of Water", true),
                Habit::new(3, "Evening Reading", false),
                Habit::new(4, "Gratitude Journal", false),
                Habit::new(5, "Take Vitamins", true),
                Habit::new(6, "Stretch/Yoga", false),
            ],
            mood: Mood::Great,
            energy: 7,
            metrics: Metrics::default(),
        }
    }
}

impl StoredDocument for WellnessData {
    const KEY: &'static str = "wellnessData";

    fn default_document() -> Self {
        Self::default()
    }
}

impl WellnessData {
    pub fn completed_habits(&self) -> usize {
        self.habits.iter().filter(|h| h.completed).count()
    }

    pub fn toggle_habit(&mut self, id: u32) -> Result<bool, AppError> {
        let habit = self
            .habits
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| AppError::invalid_action(format!("no habit with id {id}")))?;
        habit.completed = !habit.completed;
        Ok(habit.completed)
    }

    pub fn set_energy(&mut self, level: u8) -> Result<(), AppError> {
        if !ENERGY_RANGE.contains(&level) {
            return Err(AppError::invalid_action(format!(
                "energy must be {}..={}, got {level}",
                ENERGY_RANGE.start(),
                ENERGY_RANGE.end()
            )));
        }
        self.energy = level;
        Ok(())
    }

    pub fn set_metric(&mut self, metric: &str, value: f64) -> Result<(), AppError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::invalid_action(format!("{metric} cannot be {value}")));
        }
        let whole = value.round() as u32;
        match metric {
            "sleep" => self.metrics.sleep = value,
            "meditation" => self.metrics.meditation = whole,
            "water" => self.metrics.water = whole,
            "reading" => self.metrics.reading = whole,
            other => return Err(AppError::invalid_action(format!("unknown metric `{other}`"))),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct WellnessPage {
    data: WellnessData,
}

impl WellnessPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &WellnessData {
        &self.data
    }

    fn load(&mut self, ctx: &PageContext<'_>) {
        self.data = ctx.store.load();
        self.render(ctx);
    }

    fn render(&self, ctx: &PageContext<'_>) {
        let habits: String = self
            .data
            .habits
            .iter()
            .map(|habit| {
                let (icon, badge, label) = if habit.completed {
                    ("bi-check-circle-fill text-success", "bg-success", "Done")
                } else {
                    ("bi-circle text-secondary", "bg-secondary", "Pending")
                };
                format!(
                    r#"<div class="habit-item" data-action="toggle-habit" data-id="{}"><i class="bi {icon} fs-4 me-3"></i><span class="habit-name">{}</span><span class="badge {badge}">{label}</span></div>"#,
                    habit.id,
                    escape_html(&habit.name)
                )
            })
            .collect();
        ctx.render("habitsList", &habits);
        ctx.render(
            "habitsSummary",
            &format!("{}/{} habits done", self.data.completed_habits(), self.data.habits.len()),
        );

        let moods: String = Mood::ALL
            .iter()
            .map(|mood| {
                let class = if *mood == self.data.mood { " active" } else { "" };
                format!(
                    r#"<button class="mood-btn{class}" data-action="set-mood" data-mood="{mood}" title="{mood}">{}</button>"#,
                    mood.emoji()
                )
            })
            .collect();
        ctx.render("moodSelector", &moods);

        ctx.render(
            "energyValue",
            &format!(
                r#"<input type="range" min="1" max="10" data-action="set-energy" value="{energy}"><span>{energy}</span>"#,
                energy = self.data.energy
            ),
        );

        let m = self.data.metrics;
        for (metric, value, max) in [
            ("sleep", m.sleep.to_string(), 12),
            ("meditation", m.meditation.to_string(), 60),
            ("water", m.water.to_string(), 12),
            ("reading", m.reading.to_string(), 120),
        ] {
            ctx.render(
                &format!("{metric}Value"),
                &format!(
                    r#"<input type="range" min="0" max="{max}" data-action="set-metric" data-metric="{metric}" value="{value}"><span>{value}</span>"#
                ),
            );
        }
    }
}

impl PageModule for WellnessPage {
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
            "toggle-habit" => {
                self.data.toggle_habit(action.parse("id")?)?;
            }
            "set-mood" => self.data.mood = action.param("mood")?.parse()?,
            "set-energy" => {
                let level = action.parse::<u8>("value").map_err(|_| {
                    AppError::invalid_action(format!(
                        "energy must be a whole number {}..={}",
                        ENERGY_RANGE.start(),
                        ENERGY_RANGE.end()
                    ))
                })?;
                self.data.set_energy(level)?;
            }
            "set-metric" => {
                let metric = action.param("metric")?;
                self.data.set_metric(metric, action.parse("value")?)?;
            }
            other => return Err(unknown_action(ctx.page, other)),
        }
        ctx.store.save(&self.data)?;
        self.render(ctx);
        Ok(())
    }
}
