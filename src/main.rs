use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use fleetwork::aggregate::{Snapshot, my_total_work_time, snapshot};
use fleetwork::config::{Config, resolve_config_path, resolve_records_path};
use fleetwork::domain::Activity;
use fleetwork::duration::{DurationUnit, Granularity, format_duration};
use fleetwork::report::{RankMetric, format_rate, summarize_activities};
use fleetwork::sequencer::inspect_task_list;
use fleetwork::storage::{load_config, load_records};
use fleetwork::{ActivityStatus, AssignmentAction, SystemClock, activity_total};

#[derive(Debug, Parser)]
#[command(name = "fleetwork", about = "Fleet maintenance activity and work-time tracker")]
struct Cli {
	#[arg(long)]
	records: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[arg(long, default_value = "warn")]
	log_level: String,
	#[arg(long, value_enum)]
	granularity: Option<GranularityArg>,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	Snapshot {
		#[arg(long)]
		as_of: Option<String>,
		#[arg(long)]
		json: bool,
	},
	Mine {
		#[arg(long)]
		mechanic: String,
		#[arg(long)]
		as_of: Option<String>,
	},
	Report {
		#[arg(long)]
		as_of: Option<String>,
		#[arg(long)]
		top: Option<usize>,
		#[arg(long, value_enum)]
		rank_by: Option<RankArg>,
	},
	Check,
	Assign {
		#[arg(long)]
		activity: String,
		#[arg(long)]
		mechanic: String,
		#[arg(long = "task")]
		tasks: Vec<String>,
	},
	Transition {
		#[arg(long)]
		activity: String,
		#[arg(long)]
		mechanic: String,
		#[arg(long, value_enum)]
		action: ActionArg,
		#[arg(long)]
		reason: Option<String>,
	},
	StartTask {
		#[arg(long)]
		activity: String,
		#[arg(long)]
		mechanic: String,
		#[arg(long)]
		task: String,
	},
	StopTask {
		#[arg(long)]
		activity: String,
		#[arg(long)]
		mechanic: String,
		#[arg(long)]
		task: String,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GranularityArg {
	Coarse,
	Fine,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RankArg {
	WorkTime,
	Activities,
	Completed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
	Start,
	Pause,
	Resume,
	Stop,
	Delay,
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	init_tracing(&cli.log_level)?;

	let config_path = resolve_config_path(cli.config);
	let mut config = load_config(&config_path)?;
	if let Some(granularity) = cli.granularity {
		config.granularity = match granularity {
			GranularityArg::Coarse => Granularity::Coarse,
			GranularityArg::Fine => Granularity::Fine,
		};
	}
	debug!(path = %config_path.display(), "configuration loaded");

	let records_path = resolve_records_path(cli.records)?;
	let mut activities = load_records(&records_path)?;

	match cli.command {
		Command::Snapshot { as_of, json } => {
			let view = snapshot(&activities, config.unit, parse_as_of(as_of.as_deref())?);
			if json {
				println!("{}", serde_json::to_string_pretty(&view)?);
			} else {
				print_snapshot(&view, &config);
			}
		}
		Command::Mine { mechanic, as_of } => {
			let as_of = parse_as_of(as_of.as_deref())?;
			print_mine(&activities, &mechanic, as_of, &config);
		}
		Command::Report { as_of, top, rank_by } => {
			let metric = match rank_by {
				Some(RankArg::WorkTime) => RankMetric::WorkTime,
				Some(RankArg::Activities) => RankMetric::ActivityCount,
				Some(RankArg::Completed) => RankMetric::CompletedCount,
				None => config.rank_by,
			};
			let top = top.unwrap_or(config.top_mechanics);
			let as_of = parse_as_of(as_of.as_deref())?;
			print_report(&activities, metric, top, as_of, &config);
		}
		Command::Check => {
			print_check(&activities);
		}
		Command::Assign {
			activity,
			mechanic,
			tasks,
		} => {
			let names = config.task_names();
			let task_names = tasks
				.iter()
				.map(|raw| names.validate(raw))
				.collect::<Result<Vec<_>, _>>()?;
			let assignment = find_activity(&mut activities, &activity)?.assign_mechanic(&mechanic, task_names, &SystemClock)?;
			println!("{}", serde_json::to_string_pretty(assignment)?);
		}
		Command::Transition {
			activity,
			mechanic,
			action,
			reason,
		} => {
			let action = build_action(action, reason)?;
			let assignment = find_activity(&mut activities, &activity)?.apply(&mechanic, action, &SystemClock)?;
			println!("{}", serde_json::to_string_pretty(&assignment)?);
		}
		Command::StartTask {
			activity,
			mechanic,
			task,
		} => {
			let task = find_activity(&mut activities, &activity)?.start_task(&mechanic, &task, &SystemClock)?;
			println!("{}", serde_json::to_string_pretty(&task)?);
		}
		Command::StopTask {
			activity,
			mechanic,
			task,
		} => {
			let task = find_activity(&mut activities, &activity)?.stop_task(&mechanic, &task, &SystemClock)?;
			println!("{}", serde_json::to_string_pretty(&task)?);
		}
	}

	Ok(())
}

fn init_tracing(log_level: &str) -> Result<(), Box<dyn Error>> {
	let filter = EnvFilter::try_new(log_level)?;
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init()
		.map_err(|err| err.to_string())?;
	Ok(())
}

/// Only a pause carries a reason; passing one with any other action is an error.
fn build_action(action: ActionArg, reason: Option<String>) -> Result<AssignmentAction, String> {
	let action = match action {
		ActionArg::Pause => return Ok(AssignmentAction::Pause { reason }),
		ActionArg::Start => AssignmentAction::Start,
		ActionArg::Resume => AssignmentAction::Resume,
		ActionArg::Stop => AssignmentAction::Stop,
		ActionArg::Delay => AssignmentAction::Delay,
	};
	match reason {
		Some(_) => Err(format!("--reason only applies to pause, not {action}")),
		None => Ok(action),
	}
}

fn parse_as_of(input: Option<&str>) -> Result<DateTime<Utc>, Box<dyn Error>> {
	match input {
		Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc)),
		None => Ok(Utc::now()),
	}
}

fn find_activity<'a>(activities: &'a mut [Activity], id: &str) -> Result<&'a mut Activity, String> {
	activities
		.iter_mut()
		.find(|activity| activity.id == id)
		.ok_or_else(|| format!("activity not found: {id}"))
}

fn as_seconds(amount: i64, config: &Config) -> i64 {
	config.unit.to_seconds(amount)
}

fn print_snapshot(view: &Snapshot, config: &Config) {
	println!("snapshot as of {}", view.as_of.to_rfc3339());
	if view.activities.is_empty() {
		println!("no activities");
		return;
	}

	for activity in &view.activities {
		println!(
			"\n{} | {} | {} | {} | {}",
			activity.activity_id,
			activity.unit_id,
			activity.name,
			activity.status,
			format_duration(as_seconds(activity.work_time, config), config.granularity)
		);
		for mechanic in &activity.mechanics {
			println!(
				"  {} | {} | on shift {} | tasks {}",
				mechanic.mechanic_id,
				mechanic.status,
				format_duration(as_seconds(mechanic.on_shift, config), config.granularity),
				format_duration(as_seconds(mechanic.task_time, config), config.granularity)
			);
			for task in &mechanic.tasks {
				println!(
					"    {:>2}. {} | {} | {}",
					task.order,
					task.task_name,
					task.state,
					format_duration(as_seconds(task.elapsed, config), config.granularity)
				);
			}
		}
	}
}

fn print_mine(activities: &[Activity], mechanic_id: &str, as_of: DateTime<Utc>, config: &Config) {
	let mine = activities
		.iter()
		.filter(|activity| activity.mechanic(mechanic_id).is_some())
		.collect::<Vec<_>>();
	if mine.is_empty() {
		println!("no activities assigned to {mechanic_id}");
		return;
	}

	for activity in &mine {
		let total = activity_total(activity, DurationUnit::Seconds, &as_of);
		let status = activity
			.mechanic(mechanic_id)
			.map(|assignment| assignment.status.to_string())
			.unwrap_or_default();
		println!(
			"{} | {} | {} | activity total {}",
			activity.id,
			activity.name,
			status,
			format_duration(total, config.granularity)
		);
	}

	let mine_total = my_total_work_time(activities, mechanic_id, DurationUnit::Seconds, &as_of);
	println!("\nmy total work time: {}", format_duration(mine_total, config.granularity));
}

fn print_report(activities: &[Activity], metric: RankMetric, top: usize, as_of: DateTime<Utc>, config: &Config) {
	let report = summarize_activities(activities, config.unit, metric, top, &as_of);
	let total = report.total_activities;

	println!("activities: {total}");
	for (status, count) in &report.by_status {
		println!("  {status}: {count}");
	}
	println!(
		"completion rate: {}",
		format_rate(report.count(ActivityStatus::Completed), total)
	);
	println!(
		"in progress rate: {}",
		format_rate(report.count(ActivityStatus::InProgress), total)
	);
	println!(
		"total work time: {}",
		format_duration(as_seconds(report.total_work_time, config), config.granularity)
	);

	println!("\ntop mechanics:");
	for row in &report.top_mechanics {
		println!(
			"{:>2}. {} | {} | activities {} | completed {}",
			row.rank,
			row.entry.mechanic_id,
			format_duration(as_seconds(row.entry.work_time, config), config.granularity),
			row.entry.activity_count,
			row.entry.completed_count
		);
	}
}

fn print_check(activities: &[Activity]) {
	let mut found = 0;
	for activity in activities {
		for assignment in &activity.mechanics {
			for problem in inspect_task_list(&assignment.tasks) {
				found += 1;
				println!("{} | {} | {}", activity.id, assignment.mechanic_id, problem);
			}
		}
	}

	if found == 0 {
		println!("no inconsistencies in {} activities", activities.len());
	}
}
