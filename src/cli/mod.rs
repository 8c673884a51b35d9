//! Terminal surface: renderer, scheduler and subcommand output.

pub mod dashboard;
pub mod history;
pub mod scheduler;
pub mod setup;
pub mod ui;
