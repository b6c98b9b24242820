//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "toolmux";
const PROJECT_FILES: [&str; 2] = ["toolmux.toml", ".toolmux.toml"];
const ENV_PREFIX: &str = "TOOLMUX_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLMUX_`-prefixed environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolmux.toml` or `./.toolmux.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/toolmux/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }

        Self::figment(
            Self::global_config_path().as_deref(),
            Self::project_config_path().as_deref(),
            config_path,
        )
        .extract()
        .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(path) = global.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = project {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [ENV  ] {}* variables", ENV_PREFIX);

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:5}] Explicit: {}", mark, path.display());
        }

        match Self::project_config_path() {
            Some(path) => println!("  [FOUND] Project: {}", path.display()),
            None => println!("  [     ] Project: ./toolmux.toml or ./.toolmux.toml"),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:  {}", mark, path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.orchestration.max_iterations, 10);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_global_config_path() {
        let path = ConfigLoader::global_config_path();
        if let Some(path) = path {
            assert!(path.ends_with("toolmux/config.toml"));
        }
    }

    #[test]
    fn test_merge_priority() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "global.toml",
                r#"
[orchestration]
max_iterations = 4
history_limit = 6

[oracle]
model = "global-model"
"#,
            )?;
            jail.create_file(
                "toolmux.toml",
                r#"
[orchestration]
max_iterations = 7

[[providers]]
name = "docs"
command = "node"
"#,
            )?;
            jail.create_file(
                "explicit.toml",
                r#"
[oracle]
model = "explicit-model"
"#,
            )?;
            jail.set_env("TOOLMUX_ORCHESTRATION__HISTORY_LIMIT", "3");

            let config: FileConfig = ConfigLoader::figment(
                Some(Path::new("global.toml")),
                Some(Path::new("toolmux.toml")),
                Some(Path::new("explicit.toml")),
            )
            .extract()?;

            assert_eq!(config.orchestration.max_iterations, 7);
            assert_eq!(config.orchestration.history_limit, 3);
            assert_eq!(config.orchestration.request_timeout_secs, 30);
            assert_eq!(config.oracle.model, "explicit-model");
            assert_eq!(config.providers.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let result = ConfigLoader::load(Some(Path::new("nope.toml")));
            assert!(result.is_err());
            Ok(())
        });
    }
}
