//! Command-line front end: each command renders engine output for a terminal.

pub mod convert;
pub mod list;
pub mod rates;
pub mod setup;
pub mod ui;
