//! Versioned envelope and schema migration
//!
//! Every document is written as `{"version": N, "data": ...}`. Anything else
//! found under a key was written before versioning existed and is read as
//! version 0. Upgrades run one step at a time (`N -> N+1`) until the
//! document reaches the version the running code expects.
//!
//! Migration is pure: the caller decides whether to persist the result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored form of every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u32,
    pub data: Value,
}

impl Envelope {
    pub fn new(version: u32, data: Value) -> Self {
        Self { version, data }
    }

    /// Interpret a raw stored value.
    ///
    /// Only an object with exactly `version` (unsigned) and `data` counts as
    /// an envelope; every other value is a pre-versioning document.
    pub fn from_stored(raw: Value) -> Self {
        match raw {
            Value::Object(mut map) if is_envelope(&map) => {
                let version = map
                    .get("version")
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
                    .unwrap_or(0);
                let data = map.remove("data").unwrap_or(Value::Null);
                Self { version, data }
            }
            other => Self {
                version: 0,
                data: other,
            },
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::json!({ "version": self.version, "data": self.data })
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map.contains_key("data")
        && map
            .get("version")
            .and_then(Value::as_u64)
            .is_some_and(|v| u32::try_from(v).is_ok())
}

/// Upgrade function for a single version step; must be idempotent
pub type UpgradeFn = fn(Value) -> Value;

#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub from_version: u32,
    pub name: &'static str,
    pub upgrade: UpgradeFn,
}

/// Result of running the migrator over a stored value
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    pub envelope: Envelope,
    pub did_migrate: bool,
}

/// Table of `N -> N+1` steps for one document type
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    current_version: u32,
    steps: Vec<MigrationStep>,
}

impl SchemaMigrator {
    pub fn new(current_version: u32) -> Self {
        Self {
            current_version,
            steps: Vec::new(),
        }
    }

    /// Register an upgrade from `from_version` to `from_version + 1`.
    ///
    /// Versions without a registered step carry their data over unchanged.
    pub fn with_step(mut self, from_version: u32, name: &'static str, upgrade: UpgradeFn) -> Self {
        self.steps.push(MigrationStep {
            from_version,
            name,
            upgrade,
        });
        self
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Bring a stored value up to the current version
    pub fn migrate(&self, raw: Value) -> Migrated {
        let mut envelope = Envelope::from_stored(raw);

        if envelope.version > self.current_version {
            // Written by a newer build; leave it alone rather than guess
            log::warn!(
                "Document version {} is newer than supported version {}",
                envelope.version,
                self.current_version
            );
            return Migrated {
                envelope,
                did_migrate: false,
            };
        }

        let mut did_migrate = false;
        while envelope.version < self.current_version {
            if let Some(step) = self
                .steps
                .iter()
                .find(|s| s.from_version == envelope.version)
            {
                log::info!(
                    "Migrating document v{} -> v{} ({})",
                    envelope.version,
                    envelope.version + 1,
                    step.name
                );
                envelope.data = (step.upgrade)(envelope.data);
            }
            envelope.version += 1;
            did_migrate = true;
        }

        Migrated {
            envelope,
            did_migrate,
        }
    }
}
