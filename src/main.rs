use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};

use timesheet::config::{resolve_data_dir, Config};
use timesheet::domain::{format_duration, parse_component, seconds_to_hours};
use timesheet::logging::init_logging;
use timesheet::projects::ProjectRegistry;
use timesheet::report::{filter_entries, paginate, EntryFilter};
use timesheet::session::Session;
use timesheet::storage::FileStore;
use timesheet::ui::run_dashboard;
use timesheet::Timesheet;

#[derive(Debug, Parser)]
#[command(name = "timesheet", about = "Personal time tracker with projects, a timer and reports")]
struct Cli {
	#[arg(long)]
	data_dir: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	Projects,
	AddProject {
		#[arg(long)]
		name: String,
		#[arg(long)]
		color: Option<String>,
	},
	EditProject {
		#[arg(long)]
		id: String,
		#[arg(long)]
		name: String,
		#[arg(long)]
		color: String,
	},
	DeleteProject {
		#[arg(long)]
		id: String,
		#[arg(long)]
		yes: bool,
	},
	/// Start timing a project (id or unique name).
	Start {
		#[arg(long)]
		project: String,
	},
	Status,
	Stop,
	/// Correct the stopped entry before saving it.
	EditDuration {
		#[arg(long, default_value = "0")]
		hours: String,
		#[arg(long, default_value = "0")]
		minutes: String,
		#[arg(long, default_value = "0")]
		seconds: String,
	},
	Save,
	Entries {
		#[arg(long)]
		project: Option<String>,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
		#[arg(long, default_value_t = 1)]
		page: usize,
	},
	EditEntry {
		#[arg(long)]
		id: String,
		#[arg(long, default_value = "0")]
		hours: String,
		#[arg(long, default_value = "0")]
		minutes: String,
		#[arg(long, default_value = "0")]
		seconds: String,
	},
	DeleteEntry {
		#[arg(long)]
		id: String,
		#[arg(long)]
		yes: bool,
	},
	Report {
		#[arg(long)]
		project: Option<String>,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let config = Config::load()?;
	let command = cli.command.unwrap_or(Command::Dashboard);
	init_logging(config.log_filter.as_deref(), !matches!(command, Command::Dashboard));

	let data_dir = resolve_data_dir(cli.data_dir, &config);
	tracing::debug!(data_dir = %data_dir.display(), "using data directory");
	let mut timesheet = Timesheet::load(FileStore::new(data_dir), Utc::now())?;

	match command {
		Command::Dashboard => {
			run_dashboard(&mut timesheet)?;
		}
		Command::Projects => {
			print_projects(timesheet.projects());
		}
		Command::AddProject { name, color } => {
			let project = timesheet.add_project(&name, color, Utc::now())?;
			println!("created project {} ({})", project.id, project.name);
		}
		Command::EditProject { id, name, color } => {
			if timesheet.update_project(&id, &name, &color)? {
				println!("updated project {id}");
			} else {
				println!("no project {id}");
			}
		}
		Command::DeleteProject { id, yes } => {
			let Some(project) = timesheet.projects().get(&id) else {
				println!("no project {id}");
				return Ok(());
			};
			let prompt = format!("delete project {}? entries keep their history", project.name);
			if !yes && !confirm(&prompt)? {
				println!("cancelled");
				return Ok(());
			}
			timesheet.delete_project(&id)?;
			println!("deleted project {id}");
		}
		Command::Start { project } => {
			let project = timesheet
				.projects()
				.resolve(&project)
				.ok_or_else(|| format!("project not found: {project}"))?
				.clone();
			timesheet.start_timer(&project.id, Utc::now())?;
			println!("started {}", project.name);
		}
		Command::Status => {
			print_status(&timesheet);
		}
		Command::Stop => {
			let entry = timesheet.stop_timer(Utc::now())?;
			println!(
				"stopped {} after {}; run `save` to keep it",
				entry.project_name,
				format_duration(entry.duration)
			);
		}
		Command::EditDuration {
			hours,
			minutes,
			seconds,
		} => {
			let edited = timesheet.edit_staged_duration(
				parse_component(&hours),
				parse_component(&minutes),
				parse_component(&seconds),
			)?;
			println!("duration set to {}", format_duration(edited));
		}
		Command::Save => {
			let id = timesheet.save_entry()?;
			println!("saved entry {id}");
		}
		Command::Entries {
			project,
			from,
			to,
			page,
		} => {
			let filter = build_filter(timesheet.projects(), project, from, to)?;
			print_entries(&timesheet, &filter, page, config.page_size());
		}
		Command::EditEntry {
			id,
			hours,
			minutes,
			seconds,
		} => {
			let changed = timesheet.edit_entry_duration(
				&id,
				parse_component(&hours),
				parse_component(&minutes),
				parse_component(&seconds),
			)?;
			if changed {
				println!("updated entry {id}");
			} else {
				println!("no entry {id}");
			}
		}
		Command::DeleteEntry { id, yes } => {
			if timesheet.entries().get(&id).is_none() {
				println!("no entry {id}");
				return Ok(());
			}
			if !yes && !confirm(&format!("delete entry {id}? this cannot be undone"))? {
				println!("cancelled");
				return Ok(());
			}
			timesheet.delete_entry(&id)?;
			println!("deleted entry {id}");
		}
		Command::Report { project, from, to } => {
			let filter = build_filter(timesheet.projects(), project, from, to)?;
			print_report(&timesheet, &filter);
		}
	}

	Ok(())
}

fn parse_day(input: Option<String>) -> Result<Option<NaiveDate>, Box<dyn Error>> {
	match input {
		Some(raw) => Ok(Some(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")?)),
		None => Ok(None),
	}
}

fn build_filter(
	projects: &ProjectRegistry,
	project: Option<String>,
	from: Option<String>,
	to: Option<String>,
) -> Result<EntryFilter, Box<dyn Error>> {
	// deleted projects are still valid filters, so unresolved keys pass through as ids
	let project_id = project
		.filter(|key| key != "all")
		.map(|key| projects.resolve(&key).map(|project| project.id.clone()).unwrap_or(key));

	Ok(EntryFilter {
		project_id,
		from: parse_day(from)?,
		to: parse_day(to)?,
	})
}

fn confirm(prompt: &str) -> Result<bool, io::Error> {
	print!("{prompt} [y/N] ");
	io::stdout().flush()?;
	let mut answer = String::new();
	io::stdin().lock().read_line(&mut answer)?;
	Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_projects(projects: &ProjectRegistry) {
	if projects.is_empty() {
		println!("no projects yet");
		return;
	}

	for project in projects.as_slice() {
		println!(
			"{} | {} | {} | created {}",
			project.id,
			project.color,
			project.name,
			project.created_at.format("%Y-%m-%d")
		);
	}
}

fn print_status(timesheet: &Timesheet<FileStore>) {
	let now = Utc::now();
	match timesheet.session() {
		Session::Idle => println!("idle"),
		Session::Running(running) => println!(
			"running {} | {} since {}",
			running.project_name,
			format_duration(running.elapsed(now)),
			running.start_time.to_rfc3339()
		),
		Session::Stopped(entry) => println!(
			"stopped {} | {}{} | not saved yet",
			entry.project_name,
			format_duration(entry.effective_duration()),
			if entry.is_edited() {
				format!(" (measured {})", format_duration(entry.duration))
			} else {
				String::new()
			}
		),
	}
}

fn print_entries(timesheet: &Timesheet<FileStore>, filter: &EntryFilter, page: usize, page_size: usize) {
	let rows = filter_entries(timesheet.entries().as_slice(), filter);
	if rows.is_empty() {
		println!("no entries");
		return;
	}

	let page = paginate(&rows, page, page_size);
	for entry in page.items {
		println!(
			"{} | {} | {} | {}{}",
			entry.id,
			entry.date,
			format_duration(entry.effective_duration()),
			entry.project_name,
			if entry.is_edited() {
				format!(" (edited, measured {})", format_duration(entry.duration))
			} else {
				String::new()
			}
		);
	}
	println!(
		"page {}/{} | {} entries",
		page.page,
		page.total_pages.max(1),
		page.total_items
	);
}

fn print_report(timesheet: &Timesheet<FileStore>, filter: &EntryFilter) {
	let report = timesheet.report(filter);
	println!("total: {:.2}h over {} entries", report.total_hours(), report.entry_count);
	if report.entry_count == 0 {
		return;
	}

	println!("\nby project:");
	for bucket in &report.projects {
		println!(
			"{:>7.2}h | {:>3} | {} | {}",
			bucket.hours(),
			bucket.entries,
			bucket.color,
			bucket.name
		);
	}

	println!("\nby day:");
	for bucket in report.daily.iter().rev() {
		println!("{} | {:>7.2}h", bucket.date, bucket.hours());
	}

	println!("\nby week (starting Sunday):");
	for bucket in report.weekly.iter().rev() {
		println!("{} | {:>7.2}h", bucket.week_start, seconds_to_hours(bucket.seconds));
	}
}
