use std::env;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::duration::{DurationUnit, Granularity};
use crate::report::RankMetric;
use crate::sequencer::{TaskNamePolicy, TaskNames};

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "fleetwork";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub task_name_policy: TaskNamePolicy,
	pub extra_task_names: Vec<String>,
	pub granularity: Granularity,
	pub unit: DurationUnit,
	pub rank_by: RankMetric,
	pub top_mechanics: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			task_name_policy: TaskNamePolicy::Lenient,
			extra_task_names: Vec::new(),
			granularity: Granularity::Fine,
			unit: DurationUnit::Seconds,
			rank_by: RankMetric::WorkTime,
			top_mechanics: 5,
		}
	}
}

impl Config {
	pub fn task_names(&self) -> TaskNames {
		TaskNames::new(self.task_name_policy, self.extra_task_names.clone())
	}
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env::var_os("FLEETWORK_CONFIG") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	config_dir().join(CONFIG_FILE)
}

pub fn resolve_records_path(cli_path: Option<PathBuf>) -> Result<PathBuf, Error> {
	if let Some(path) = cli_path {
		return Ok(absolutize(path));
	}

	if let Some(path) = env::var_os("FLEETWORK_RECORDS") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return Ok(absolutize(path));
		}
	}

	Err(Error::new(
		ErrorKind::NotFound,
		"no activity records selected: pass --records <path> or set FLEETWORK_RECORDS",
	))
}

fn config_dir() -> PathBuf {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".config").join(APP_DIR);
	}

	PathBuf::from(".fleetwork")
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::{Config, resolve_config_path, resolve_records_path};
	use crate::duration::{DurationUnit, Granularity};
	use crate::sequencer::TaskNamePolicy;

	#[test]
	fn partial_toml_keeps_defaults() {
		let config: Config = toml::from_str(
			r#"
task_name_policy = "strict"
extra_task_names = ["GREASING"]
unit = "minutes"
"#,
		)
		.expect("config should parse");

		assert_eq!(config.task_name_policy, TaskNamePolicy::Strict);
		assert_eq!(config.unit, DurationUnit::Minutes);
		assert_eq!(config.granularity, Granularity::Fine);
		assert_eq!(config.top_mechanics, 5);
		assert!(config.task_names().validate("GREASING").is_ok());
		assert!(config.task_names().validate("UNHEARD_OF").is_err());
	}

	#[test]
	fn explicit_paths_win() {
		let explicit = std::env::temp_dir().join("fleetwork_explicit.toml");
		assert_eq!(resolve_config_path(Some(explicit.clone())), explicit);

		let records = resolve_records_path(Some(PathBuf::from("/srv/fleet/records.jsonl")))
			.expect("explicit records path");
		assert_eq!(records, PathBuf::from("/srv/fleet/records.jsonl"));
	}
}
