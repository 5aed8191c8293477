//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/reportforge/config.toml)
//! 3. Project config (.reportforge/config.toml)
//! 4. Environment variables (REPORTFORGE_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ReportError, Result};

/// Environment variable prefix for config overrides
const ENV_PREFIX: &str = "REPORTFORGE_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let global = Self::global_config_path();
        Self::load_layers(global.as_deref(), &Self::project_config_path())
    }

    /// Load configuration from explicit global and project file locations.
    /// Missing files are skipped.
    pub fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // REPORTFORGE_LLM__MODEL -> llm.model, REPORTFORGE_RESEARCH__MAX_ITERATIONS -> research.max_iterations
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ReportError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/reportforge/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("reportforge"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project settings directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".reportforge")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Describe config file locations and whether they exist
    pub fn describe_paths() -> Vec<(&'static str, Option<PathBuf>, bool)> {
        let global = Self::global_config_path();
        let global_exists = global.as_ref().is_some_and(|p| p.exists());
        let project = Self::project_config_path();
        let project_exists = project.exists();
        vec![
            ("Global", global, global_exists),
            ("Project", Some(project), project_exists),
        ]
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(config: &Config) -> Result<String> {
        toml::to_string_pretty(config).map_err(|e| ReportError::Config(e.to_string()))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ReportError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::write_default(&global_dir, force)
    }

    /// Initialize project configuration in the current directory
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::write_default(&Self::project_dir(), force)
    }

    /// Write the default config template into `dir`, returning the file path
    pub fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Default config template (TOML)
    fn default_config() -> &'static str {
        r#"# ReportForge Configuration
# Project settings in .reportforge/config.toml override global ones.
# API keys are read from the environment: OPENAI_API_KEY, AZURE_OPENAI_API_KEY
# (or AOAI_KEY), TAVILY_API_KEY.

version = "1.0"

[llm]
provider = "openai"          # openai | azure-openai | ollama
model = "gpt-4o"
timeout_secs = 300
temperature = 0.0
max_tokens = 4096
max_retries = 2
# api_base = "https://my-resource.openai.azure.com"
# azure_deployment = "gpt-4o"
# fallback_provider = "ollama"
# fallback_model = "llama3.1"

[search]
provider = "tavily"
timeout_secs = 40
max_results = 5
topic = "general"            # general | news
# days = 7                   # news topic only
include_raw_content = true

[research]
max_iterations = 3
max_queries = 4
max_tokens_per_source = 1000
include_raw_content = false
section_concurrency = 4
honor_research_flag = true
# section_timeout_secs = 600
on_section_failure = "placeholder"   # placeholder | abort

[output]
dir = "reports"
formats = ["markdown", "html"]
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchTopic, SectionFailurePolicy};
    use tempfile::TempDir;

    #[test]
    fn test_default_template_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.research.max_iterations, 3);
        assert_eq!(config.search.topic, SearchTopic::General);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[llm]\nmodel = \"global-model\"\n[search]\ntopic = \"news\"\n").unwrap();
        fs::write(
            &project,
            "[llm]\nmodel = \"project-model\"\n[research]\non_section_failure = \"abort\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_layers(Some(&global), &project).unwrap();
        assert_eq!(config.llm.model, "project-model");
        assert_eq!(config.search.topic, SearchTopic::News);
        assert_eq!(
            config.research.on_section_failure,
            SectionFailurePolicy::Abort
        );
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_layers(
            Some(&temp_dir.path().join("absent.toml")),
            &temp_dir.path().join("also-absent.toml"),
        )
        .unwrap();
        assert_eq!(config.output.dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[research]\nmax_queries = 9\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_write_default_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        fs::write(&path, "# edited\n").unwrap();

        ConfigLoader::write_default(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# edited\n");

        ConfigLoader::write_default(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[research]"));
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("REPORTFORGE_SEARCH__MAX_RESULTS", "7");
        }
        let config =
            ConfigLoader::load_layers(None, &temp_dir.path().join("absent.toml")).unwrap();
        unsafe {
            std::env::remove_var("REPORTFORGE_SEARCH__MAX_RESULTS");
        }
        assert_eq!(config.search.max_results, 7);
    }
}
