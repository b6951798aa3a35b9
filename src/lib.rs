pub mod config;
pub mod domain;
pub mod entries;
pub mod error;
pub mod logging;
pub mod projects;
pub mod report;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod ui;

pub use error::{Result, TimesheetError};
pub use tracker::Timesheet;
