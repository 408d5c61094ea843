//! Exercise catalog shared by the fitness and fitness-table pages
//!
//! The base catalog comes from `data/exercises.json`; a copy of that file is
//! compiled in and used whenever the fetch fails. User-created and
//! user-edited exercises live in the `custom-exercises` document.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::persistence::{StoredDocument, lenient};
use crate::platform::FragmentSource;

/// `created_by` value marking an exercise as user data
pub const USER_AUTHOR: &str = "User";

const EMBEDDED_CATALOG: &str = include_str!("../../data/exercises.json");

/// Repetitions are a count for most exercises and free text ("45 sec") for holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reps {
    Count(u32),
    Text(String),
}

impl fmt::Display for Reps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reps::Count(n) => write!(f, "{n}"),
            Reps::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogExercise {
    pub id: String,
    pub name: String,
    pub category: String,
    pub equipment: String,
    pub primary_muscle: String,
    pub secondary_muscles: Vec<String>,
    #[serde(deserialize_with = "lenient::whole")]
    pub sets: u32,
    pub reps: Option<Reps>,
    pub weight: Option<f64>,
    /// Seconds
    #[serde(deserialize_with = "lenient::whole")]
    pub duration: u32,
    /// Seconds
    #[serde(deserialize_with = "lenient::whole")]
    pub rest_time: u32,
    pub instructions: String,
    pub tips: String,
    pub image_url: String,
    pub video_url: String,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub calories_per_minute: f64,
    pub created_by: String,
    pub is_active: bool,
}

impl Default for CatalogExercise {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            category: String::new(),
            equipment: String::new(),
            primary_muscle: String::new(),
            secondary_muscles: Vec::new(),
            sets: 0,
            reps: None,
            weight: None,
            duration: 0,
            rest_time: 60,
            instructions: String::new(),
            tips: String::new(),
            image_url: String::new(),
            video_url: String::new(),
            difficulty: String::new(),
            kind: "Strength".to_string(),
            calories_per_minute: 0.0,
            created_by: "System".to_string(),
            is_active: true,
        }
    }
}

impl CatalogExercise {
    pub fn is_custom(&self) -> bool {
        self.created_by == USER_AUTHOR
    }

    /// Lower-cased category, used as the muscle-group filter key
    pub fn group(&self) -> String {
        self.category.to_lowercase()
    }

    pub fn reps_label(&self, missing: &str) -> String {
        self.reps
            .as_ref()
            .map_or_else(|| missing.to_string(), Reps::to_string)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration.div_ceil(60)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    exercises: Vec<CatalogExercise>,
}

pub fn parse_catalog(path: &str, text: &str) -> Result<Vec<CatalogExercise>, AppError> {
    serde_json::from_str::<CatalogFile>(text)
        .map(|file| file.exercises)
        .map_err(|e| AppError::parse(path, e))
}

pub fn embedded_catalog() -> Vec<CatalogExercise> {
    parse_catalog("embedded exercises.json", EMBEDDED_CATALOG).unwrap_or_else(|err| {
        log::error!("{err}");
        Vec::new()
    })
}

/// Fetch the base catalog, falling back to the embedded copy
pub async fn fetch_catalog(source: &dyn FragmentSource, path: &str) -> Vec<CatalogExercise> {
    let fetched = match source.fetch_text(path).await {
        Ok(text) => parse_catalog(path, &text),
        Err(err) => Err(err),
    };
    match fetched {
        Ok(exercises) => {
            log::info!("Loaded {} exercises from {path}", exercises.len());
            exercises
        }
        Err(err) => {
            log::warn!("{err}; using embedded exercise catalog");
            embedded_catalog()
        }
    }
}

/// Base catalog with stored custom exercises applied.
///
/// A custom entry replaces the catalog entry with the same id (an edited
/// system exercise); the rest are appended. Always rebuilt from scratch, so
/// repeated activations never duplicate entries.
pub fn merge_custom(base: &[CatalogExercise], custom: &[CatalogExercise]) -> Vec<CatalogExercise> {
    let mut merged: Vec<CatalogExercise> = base
        .iter()
        .map(|ex| {
            custom
                .iter()
                .find(|c| c.id == ex.id)
                .unwrap_or(ex)
                .clone()
        })
        .collect();
    for ex in custom {
        if !merged.iter().any(|m| m.id == ex.id) {
            merged.push(ex.clone());
        }
    }
    merged
}

/// User-created exercises, persisted under `custom-exercises`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomExercises(#[serde(deserialize_with = "lenient::entries")] pub Vec<CatalogExercise>);

impl StoredDocument for CustomExercises {
    const KEY: &'static str = "custom-exercises";

    fn default_document() -> Self {
        Self::default()
    }
}
