//! Configuration handling for the redcomp CLI

use anyhow::{Context, Result};
use redcomp_solver::job::DEFAULT_QUEUE_CAPACITY;
use redcomp_solver::SolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the solver executable
pub const SOLVER_ENV: &str = "REDCOMP_SOLVER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverSection,

    #[serde(default)]
    pub job: JobSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSection {
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub keep_temp_files: bool,

    /// Seconds per script
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            args: Vec::new(),
            temp_dir: None,
            keep_temp_files: false,
            timeout: None,
        }
    }
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("redcsl")
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Config {
    /// Replace the solver executable when `executable` is set and non-empty
    pub fn override_executable(&mut self, executable: Option<String>) {
        if let Some(executable) = executable.filter(|e| !e.trim().is_empty()) {
            self.solver.executable = PathBuf::from(executable);
        }
    }

    pub fn solver_config(&self) -> Result<SolverConfig> {
        let config = SolverConfig {
            executable: self.solver.executable.clone(),
            args: self.solver.args.clone(),
            temp_dir: self.solver.temp_dir.clone(),
            keep_temp_files: self.solver.keep_temp_files,
            timeout: None,
        };
        match self.solver.timeout {
            Some(seconds) => Ok(config.with_timeout(seconds)?),
            None => Ok(config),
        }
    }
}

/// Load configuration from `path`, `~/.redcomp/config.toml`, or defaults,
/// then apply the environment override
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config(&path)?,
        None => match dirs::home_dir() {
            Some(home) => {
                let default_path = home.join(".redcomp").join("config.toml");
                if default_path.exists() {
                    read_config(&default_path)?
                } else {
                    Config::default()
                }
            }
            None => Config::default(),
        },
    };
    config.override_executable(std::env::var(SOLVER_ENV).ok());
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read configuration {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Invalid configuration {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.solver.executable, PathBuf::from("redcsl"));
        assert_eq!(config.job.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_file_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[solver]
executable = "/opt/reduce/bin/redcsl"
args = ["-w"]
keep_temp_files = true
timeout = 30

[job]
queue_capacity = 2
"#,
        )
        .unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(config.job.queue_capacity, 2);
        let solver = config.solver_config().unwrap();
        assert_eq!(solver.executable, PathBuf::from("/opt/reduce/bin/redcsl"));
        assert_eq!(solver.args, vec!["-w".to_string()]);
        assert!(solver.keep_temp_files);
        assert_eq!(solver.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.solver.timeout = Some(0);
        assert!(config.solver_config().is_err());
    }

    #[test]
    fn test_executable_override() {
        let mut config = Config::default();
        config.override_executable(Some("  ".to_string()));
        assert_eq!(config.solver.executable, PathBuf::from("redcsl"));
        config.override_executable(Some("/usr/local/bin/redcsl".to_string()));
        assert_eq!(
            config.solver.executable,
            PathBuf::from("/usr/local/bin/redcsl")
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("Cannot read configuration"));
    }
}
