use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::Activity;
use crate::sequencer::inspect_task_list;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to parse activity record on line {line}: {source}")]
    JsonDecode {
        line: usize,
        source: serde_json::Error,
    },
}

/// Reads activity records exported by the planning backend.
///
/// Accepts a JSON array or one activity per line. Task lists are inspected
/// and any inconsistency is logged, never corrected.
pub fn load_records(path: &Path) -> Result<Vec<Activity>, StorageError> {
    let raw = fs::read_to_string(path)?;
    let trimmed = raw.trim_start();

    let activities: Vec<Activity> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|source| StorageError::JsonDecode { line: 1, source })?
    } else {
        let mut activities = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let activity: Activity = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
                line: index + 1,
                source,
            })?;
            activities.push(activity);
        }
        activities
    };

    for activity in &activities {
        for assignment in &activity.mechanics {
            for problem in inspect_task_list(&assignment.tasks) {
                warn!(
                    activity_id = %activity.id,
                    mechanic_id = %assignment.mechanic_id,
                    %problem,
                    "inconsistent task list"
                );
            }
        }
    }

    debug!(path = %path.display(), count = activities.len(), "activity records loaded");
    Ok(activities)
}

/// Missing config file means defaults.
pub fn load_config(path: &Path) -> Result<Config, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    Ok(toml::from_str(&raw)?)
}
