use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::report::DEFAULT_PAGE_SIZE;

const APP_DIR: &str = "timesheet";
const CONFIG_FILE: &str = "config.toml";

/// Optional settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
	pub data_dir: Option<PathBuf>,
	pub page_size: Option<usize>,
	pub log_filter: Option<String>,
}

impl Config {
	/// Loads from `$TIMESHEET_CONFIG` or the default config location.
	pub fn load() -> Result<Self> {
		let path = env::var_os("TIMESHEET_CONFIG")
			.map(PathBuf::from)
			.filter(|path| !path.as_os_str().is_empty())
			.unwrap_or_else(default_config_path);
		Self::from_path(&path)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let raw = match fs::read_to_string(path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
			Err(err) => return Err(err.into()),
		};
		Self::parse(&raw)
	}

	pub fn parse(raw: &str) -> Result<Self> {
		Ok(toml::from_str(raw)?)
	}

	pub fn page_size(&self) -> usize {
		self.page_size.filter(|size| *size > 0).unwrap_or(DEFAULT_PAGE_SIZE)
	}
}

/// CLI flag, then `$TIMESHEET_DATA_DIR`, then config, then the platform data directory.
pub fn resolve_data_dir(cli_path: Option<PathBuf>, config: &Config) -> PathBuf {
	resolve_data_dir_from(cli_path, env::var_os("TIMESHEET_DATA_DIR"), config)
}

fn resolve_data_dir_from(cli_path: Option<PathBuf>, env_path: Option<OsString>, config: &Config) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env_path {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	if let Some(path) = &config.data_dir {
		return absolutize(path.clone());
	}

	default_data_dir()
}

fn default_data_dir() -> PathBuf {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(APP_DIR);
		}
	}

	if let Some(path) = env::var_os("XDG_DATA_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".local").join("share").join(APP_DIR);
	}

	PathBuf::from(".timesheet")
}

fn default_config_path() -> PathBuf {
	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("APPDATA") {
			return PathBuf::from(path).join(APP_DIR).join(CONFIG_FILE);
		}
	}

	if let Some(path) = env::var_os("XDG_CONFIG_HOME") {
		return PathBuf::from(path).join(APP_DIR).join(CONFIG_FILE);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path).join(".config").join(APP_DIR).join(CONFIG_FILE);
	}

	PathBuf::from(CONFIG_FILE)
}

fn absolutize(path: PathBuf) -> PathBuf {
	if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	}
}
