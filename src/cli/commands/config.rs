//! Config Command
//!
//! Usage:
//!   reportforge config show [-f text|json|yaml]
//!   reportforge config path
//!   reportforge config init [-g] [--force]

use crate::cli::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::{ReportError, Result};

/// Print the effective configuration (all layers merged)
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", render(&config, format)?);
    Ok(())
}

fn render(config: &Config, format: &str) -> Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(config)?),
        "yaml" => Ok(serde_yaml::to_string(config)?),
        "text" | "toml" => ConfigLoader::to_toml(config),
        other => Err(ReportError::Config(format!(
            "Unknown format '{}'. Valid values: text, json, yaml",
            other
        ))),
    }
}

/// Print configuration file locations
pub fn path() -> Result<()> {
    let out = Output::new();
    out.section("Configuration paths");
    for (label, path, exists) in ConfigLoader::describe_paths() {
        match path {
            Some(path) => out.path(label, &path, exists),
            None => println!("  {:<9} (not available)", format!("{}:", label)),
        }
    }
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let out = Output::new();
    let path = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };
    out.success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    out.field("Config", path.display());
    Ok(())
}
