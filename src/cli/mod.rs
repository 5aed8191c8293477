pub mod commands;
pub mod ui;

pub use commands::generate::{GenerateOptions, GenerateOutcome};
pub use ui::Output;
