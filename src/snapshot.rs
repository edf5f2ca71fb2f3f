//! The in-memory counts snapshot and its JSON persistence.
//!
//! A snapshot is built fresh every run: seeded from the previous module
//! text, filled in by the collectors, written to a timestamped JSON file
//! under `log_dir` (so a failed upload never loses a run's scraping work),
//! and finally rendered into the wiki modules.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use crate::error::CountsError;
use crate::finder::LowestRank;
use crate::lang::{Language, Table};
use crate::skill::Skill;

/// A single cell of a count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountValue {
    /// Number of qualifying players (a rank; 0 means none qualify).
    Rank(u64),
    /// The lowest-ranks entry for a skill.
    Lowest(LowestRank),
}

/// One table's worth of per-skill values plus its update timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCounts {
    pub counts: BTreeMap<Skill, CountValue>,
    pub updated: Option<DateTime<Utc>>,
}

/// Every table's counts for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountsSnapshot {
    pub tables: BTreeMap<Table, TableCounts>,
}

impl CountsSnapshot {
    pub fn get(&self, table: Table, skill: Skill) -> Option<CountValue> {
        self.tables.get(&table)?.counts.get(&skill).copied()
    }

    /// The plain rank stored for `(table, skill)`, if there is one.
    pub fn rank(&self, table: Table, skill: Skill) -> Option<u64> {
        match self.get(table, skill)? {
            CountValue::Rank(rank) => Some(rank),
            CountValue::Lowest(_) => None,
        }
    }

    pub fn set(&mut self, table: Table, skill: Skill, value: CountValue) {
        self.table_mut(table).counts.insert(skill, value);
    }

    pub fn table_mut(&mut self, table: Table) -> &mut TableCounts {
        self.tables.entry(table).or_default()
    }

    /// Render the snapshot as the JSON document stored under `log_dir`.
    ///
    /// Object keys end up sorted because `serde_json`'s map is ordered.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();

        for (table, counts) in &self.tables {
            let mut entries = Map::new();

            for (skill, value) in &counts.counts {
                let rendered = match value {
                    CountValue::Rank(rank) => json!(rank),
                    CountValue::Lowest(lowest) => json!({
                        "rank": lowest.rank,
                        "level": lowest.level,
                    }),
                };
                entries.insert(skill.en_name().to_string(), rendered);
            }

            if let Some(updated) = &counts.updated {
                entries.insert(
                    "updated".to_string(),
                    json!(Language::En.format_date(updated)),
                );
            }

            root.insert(table.en_key().to_string(), Value::Object(entries));
        }

        Value::Object(root)
    }

    /// Write the snapshot file: 2-space indent, sorted keys, trailing newline.
    pub fn write(&self, path: &Path) -> Result<(), CountsError> {
        let rendered = serde_json::to_string_pretty(&self.to_json())
            .expect("snapshot JSON is always serializable");

        std::fs::write(path, rendered + "\n").map_err(|source| CountsError::SnapshotWrite {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!(path = %path.display(), "snapshot written");
        Ok(())
    }
}
