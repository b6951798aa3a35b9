use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};

use crate::domain::{format_duration, FALLBACK_COLOR};
use crate::report::{EntryFilter, Report};
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::tracker::Timesheet;

const RECENT_DAYS_SHOWN: usize = 10;
const BAR_WIDTH: f64 = 20.0;
const RUNNING_COLOR: Color = Color::LightGreen;
const STOPPED_COLOR: Color = Color::Yellow;

pub fn run_dashboard<S: KeyValueStore>(timesheet: &mut Timesheet<S>) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, timesheet);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<S: KeyValueStore>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	timesheet: &mut Timesheet<S>,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(timesheet);

	loop {
		// every frame re-reads the clock; nothing about the tick is stored
		let now = Utc::now();
		let view = build_view(&app, timesheet, now);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				if handle_key(&mut app, key.code, timesheet, Utc::now()) {
					break;
				}
			}
		}
	}

	Ok(())
}

fn handle_key<S: KeyValueStore>(
	app: &mut App,
	code: KeyCode,
	timesheet: &mut Timesheet<S>,
	now: DateTime<Utc>,
) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('k') => app.move_project(-1, timesheet),
		KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('j') => app.move_project(1, timesheet),
		KeyCode::Char(' ') => {
			app.status = if timesheet.session().is_running() {
				match timesheet.stop_timer(now) {
					Ok(entry) => format!(
						"stopped after {} (s save, +/- adjust, space discard and restart)",
						format_duration(entry.duration)
					),
					Err(err) => err.to_string(),
				}
			} else {
				match app.selected_project_id(timesheet) {
					Some(project_id) => match timesheet.start_timer(&project_id, now) {
						Ok(()) => "timer started".to_string(),
						Err(err) => err.to_string(),
					},
					None => "no project to start; add one with `timesheet add-project`".to_string(),
				}
			};
		}
		KeyCode::Char('s') => {
			app.status = match timesheet.save_entry() {
				Ok(id) => format!("saved entry {id}"),
				Err(err) => err.to_string(),
			};
		}
		KeyCode::Char('+') => adjust_staged(app, timesheet, 60),
		KeyCode::Char('-') => adjust_staged(app, timesheet, -60),
		_ => {}
	}

	false
}

fn adjust_staged<S: KeyValueStore>(app: &mut App, timesheet: &mut Timesheet<S>, delta: i64) {
	let Session::Stopped(entry) = timesheet.session() else {
		app.status = "stop the timer before adjusting its duration".to_string();
		return;
	};

	let seconds = entry.effective_duration().saturating_add(delta).max(0) as u64;
	app.status = match timesheet.edit_staged_duration(seconds / 3600, (seconds % 3600) / 60, seconds % 60) {
		Ok(edited) => format!("duration set to {}", format_duration(edited)),
		Err(err) => err.to_string(),
	};
}

fn build_view<S: KeyValueStore>(app: &App, timesheet: &Timesheet<S>, now: DateTime<Utc>) -> ViewModel {
	let session = timesheet.session();
	let projects = timesheet.projects();
	let timer = match session {
		Session::Idle => TimerView {
			state: "idle",
			project_name: None,
			color: None,
			elapsed: 0,
		},
		Session::Running(running) => TimerView {
			state: session.state_name(),
			project_name: Some(running.project_name.clone()),
			color: color_from_hex(projects.color_for(&running.project_id)),
			elapsed: running.elapsed(now),
		},
		Session::Stopped(entry) => TimerView {
			state: session.state_name(),
			project_name: Some(entry.project_name.clone()),
			color: color_from_hex(projects.color_for(&entry.project_id)),
			elapsed: entry.effective_duration(),
		},
	};

	let selected_project = projects
		.as_slice()
		.get(app.selected_project)
		.map(|project| (project.name.clone(), color_from_hex(&project.color)));

	ViewModel {
		timer,
		selected_project,
		report: timesheet.report(&EntryFilter::default()),
	}
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(5), Constraint::Min(12), Constraint::Length(4)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
		.split(layout[1]);

	let right = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
		.split(body[1]);

	render_timer_panel(frame, layout[0], view);
	render_daily_panel(frame, body[0], &view.report);
	render_projects_panel(frame, right[0], &view.report);
	render_weekly_panel(frame, right[1], &view.report);
	render_footer(frame, layout[2], app);
}

fn render_timer_panel(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let timer = &view.timer;
	let state_style = match timer.state {
		"running" => Style::default().fg(RUNNING_COLOR).add_modifier(Modifier::BOLD),
		"stopped" => Style::default().fg(STOPPED_COLOR).add_modifier(Modifier::BOLD),
		_ => Style::default().fg(Color::DarkGray),
	};

	let mut current = vec![
		Span::styled(format!("{:<8}", timer.state), state_style),
		Span::styled(
			format_duration(timer.elapsed),
			Style::default().add_modifier(Modifier::BOLD),
		),
	];
	if let Some(name) = &timer.project_name {
		current.push(Span::raw("  "));
		current.push(Span::styled(name.clone(), color_style(timer.color)));
	}

	let selected = match &view.selected_project {
		Some((name, color)) => Line::from(vec![
			Span::raw("next project: "),
			Span::styled(name.clone(), color_style(*color)),
		]),
		None => Line::from("next project: (none)"),
	};

	let lines = vec![
		Line::from(current),
		selected,
		Line::from(format!(
			"total tracked: {:.2}h over {} entries",
			view.report.total_hours(),
			view.report.entry_count
		)),
	];
	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Timer"));
	frame.render_widget(panel, area);
}

fn render_daily_panel(frame: &mut Frame, area: Rect, report: &Report) {
	let days = report
		.daily
		.iter()
		.rev()
		.take(RECENT_DAYS_SHOWN)
		.collect::<Vec<_>>();
	let max_seconds = days.iter().map(|bucket| bucket.seconds).max().unwrap_or(0);

	let mut lines = Vec::new();
	if days.is_empty() {
		lines.push(Line::from("(no saved entries)"));
	}
	for bucket in days {
		lines.push(Line::from(format!(
			"{} {:>8} {}",
			bucket.date.format("%a %d %b"),
			format_duration(bucket.seconds),
			text_bar(bucket.seconds, max_seconds)
		)));
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Daily"));
	frame.render_widget(panel, area);
}

fn render_projects_panel(frame: &mut Frame, area: Rect, report: &Report) {
	let mut lines = Vec::new();
	if report.projects.is_empty() {
		lines.push(Line::from("(none)"));
	}
	for bucket in &report.projects {
		lines.push(Line::from(vec![
			Span::styled(bucket.name.clone(), color_style(color_from_hex(&bucket.color))),
			Span::raw(format!(
				" | {:.2}h | {} {}",
				bucket.hours(),
				bucket.entries,
				if bucket.entries == 1 { "entry" } else { "entries" }
			)),
		]));
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("By Project"));
	frame.render_widget(panel, area);
}

fn render_weekly_panel(frame: &mut Frame, area: Rect, report: &Report) {
	let max_seconds = report.weekly.iter().map(|bucket| bucket.seconds).max().unwrap_or(0);
	let mut lines = Vec::new();
	if report.weekly.is_empty() {
		lines.push(Line::from("(none)"));
	}
	for bucket in report.weekly.iter().rev() {
		lines.push(Line::from(format!(
			"week of {} {:>7.2}h {}",
			bucket.week_start.format("%d %b"),
			bucket.hours(),
			text_bar(bucket.seconds, max_seconds)
		)));
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Weekly"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = vec![
		Line::from("space start/stop | s save | +/- adjust stopped duration | arrows/hjkl pick project | q quit"),
		Line::from(app.status.clone()),
	];
	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn text_bar(seconds: i64, max_seconds: i64) -> String {
	if seconds <= 0 {
		return String::new();
	}
	let width = ((seconds as f64 / max_seconds.max(1) as f64) * BAR_WIDTH).round() as usize;
	"=".repeat(width.max(1))
}

fn color_style(color: Option<Color>) -> Style {
	color.map(|color| Style::default().fg(color)).unwrap_or_default()
}

/// Parses `#rrggbb`. Anything else gets the fallback color, or no color if that fails too.
fn color_from_hex(value: &str) -> Option<Color> {
	parse_hex(value).or_else(|| parse_hex(FALLBACK_COLOR))
}

fn parse_hex(value: &str) -> Option<Color> {
	let hex = value.trim().strip_prefix('#')?;
	if hex.len() != 6 || !hex.is_ascii() {
		return None;
	}
	let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
	Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

struct App {
	selected_project: usize,
	status: String,
}

impl App {
	fn new<S: KeyValueStore>(timesheet: &Timesheet<S>) -> Self {
		let selected_project = timesheet
			.session()
			.project_id()
			.and_then(|id| {
				timesheet
					.projects()
					.as_slice()
					.iter()
					.position(|project| project.id == id)
			})
			.unwrap_or(0);
		Self {
			selected_project,
			status: String::new(),
		}
	}

	fn move_project<S: KeyValueStore>(&mut self, delta: i32, timesheet: &Timesheet<S>) {
		let len = timesheet.projects().len();
		if len == 0 {
			self.selected_project = 0;
			return;
		}
		let next = (self.selected_project as i64 + i64::from(delta)).rem_euclid(len as i64);
		self.selected_project = next as usize;
	}

	fn selected_project_id<S: KeyValueStore>(&self, timesheet: &Timesheet<S>) -> Option<String> {
		timesheet
			.projects()
			.as_slice()
			.get(self.selected_project)
			.map(|project| project.id.clone())
	}
}

struct ViewModel {
	timer: TimerView,
	selected_project: Option<(String, Option<Color>)>,
	report: Report,
}

struct TimerView {
	state: &'static str,
	project_name: Option<String>,
	color: Option<Color>,
	elapsed: i64,
}
