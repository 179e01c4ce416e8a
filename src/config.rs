use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".cadence";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_REFRESH_TIME: &str = "04:30";
const DEFAULT_WEEKLY_GOAL_HOURS: f64 = 40.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_port: u16,
    pub refresh_time: String,
    pub retention_days: u32,
    pub default_weekly_goal_hours: f64,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("cadence.db"),
            api_port: 7180,
            refresh_time: DEFAULT_REFRESH_TIME.to_string(),
            retention_days: 365,
            default_weekly_goal_hours: DEFAULT_WEEKLY_GOAL_HOURS,
        }
    }
}

impl Config {
    pub fn root_dir() -> Result<PathBuf> {
        Ok(default_root_dir())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir()?;
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    pub fn parse_refresh_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.refresh_time)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "refresh_time" => {
                parse_hhmm(value)?;
                self.refresh_time = value.to_string();
            }
            "retention_days" => {
                self.retention_days = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("retention_days must be a number"))?;
            }
            "default_weekly_goal_hours" => {
                let parsed = value
                    .parse::<f64>()
                    .map_err(|_| anyhow!("default_weekly_goal_hours must be a number"))?;
                if !parsed.is_finite() || parsed < 0.0 {
                    bail!("default_weekly_goal_hours must be a non-negative number");
                }
                self.default_weekly_goal_hours = parsed;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, api_port|api.port, refresh_time|refresh.time, retention_days|retention.days, default_weekly_goal_hours|goal.weekly_hours"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "refresh_time" => Some(self.refresh_time.clone()),
            "retention_days" => Some(self.retention_days.to_string()),
            "default_weekly_goal_hours" => Some(self.default_weekly_goal_hours.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "api_port" | "api.port" => "api_port",
        "refresh_time" | "refresh.time" => "refresh_time",
        "retention_days" | "retention.days" => "retention_days",
        "default_weekly_goal_hours" | "goal.weekly_hours" => "default_weekly_goal_hours",
        _ => key,
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("Invalid time format: {value}. Example: 04:30 (24-hour format)",))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn set_and_get_roundtrip_with_aliases() {
        let mut config = Config::default();

        config.set_value("refresh.time", "06:15").expect("set");
        assert_eq!(config.get_value("refresh_time").as_deref(), Some("06:15"));

        config.set_value("goal.weekly_hours", "32.5").expect("set");
        assert_eq!(
            config.get_value("default_weekly_goal_hours").as_deref(),
            Some("32.5")
        );
    }

    #[test]
    fn rejects_malformed_values() {
        let mut config = Config::default();

        assert!(config.set_value("refresh_time", "25:99").is_err());
        assert!(config.set_value("api_port", "not-a-port").is_err());
        assert!(config.set_value("default_weekly_goal_hours", "-5").is_err());
        assert!(config.set_value("no_such_key", "1").is_err());
    }
}
