#[macro_use]
pub mod macros;

pub mod config;
pub mod display;
pub mod parser;
pub mod reconcile;
pub mod schema;
