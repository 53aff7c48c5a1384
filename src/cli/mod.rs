pub mod analyze;
pub mod config_check;
pub mod report;
