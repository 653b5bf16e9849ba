use std::path::PathBuf;

use crate::streak::StreakMode;
use crate::AppResult;

pub const DATA_DIR_ENV: &str = "TASKFORGE_DATA_DIR";
pub const STREAK_MODE_ENV: &str = "TASKFORGE_STREAK_MODE";
pub const LOG_ENV: &str = "TASKFORGE_LOG";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Older deployments exported the key under this generic name.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";
pub const GEMINI_MODEL_ENV: &str = "TASKFORGE_GEMINI_MODEL";
pub const GEMINI_BASE_URL_ENV: &str = "TASKFORGE_GEMINI_BASE_URL";

pub const APP_IDENTIFIER: &str = "com.taskforge.app";
pub const DEFAULT_LOG_FILTER: &str = "taskforge=info";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub streak_mode: StreakMode,
    pub log_filter: String,
    pub planner: PlannerConfig,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = get(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let streak_mode = match get(STREAK_MODE_ENV) {
            Some(raw) => raw.parse()?,
            None => StreakMode::default(),
        };

        Ok(Self {
            data_dir,
            streak_mode,
            log_filter: get(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            planner: PlannerConfig {
                api_key: get(GEMINI_API_KEY_ENV).or_else(|| get(FALLBACK_API_KEY_ENV)),
                model: get(GEMINI_MODEL_ENV).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                base_url: get(GEMINI_BASE_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            },
        })
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir);
    base.join(APP_IDENTIFIER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppResult<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.data_dir.ends_with(APP_IDENTIFIER));
        assert_eq!(cfg.streak_mode, StreakMode::Counter);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(cfg.planner.api_key, None);
        assert_eq!(cfg.planner.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.planner.base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            (DATA_DIR_ENV, "/tmp/tf"),
            (STREAK_MODE_ENV, "consecutive"),
            (GEMINI_API_KEY_ENV, "k1"),
            (GEMINI_MODEL_ENV, "gemini-pro"),
        ])
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/tf"));
        assert_eq!(cfg.streak_mode, StreakMode::Consecutive);
        assert_eq!(cfg.planner.api_key.as_deref(), Some("k1"));
        assert_eq!(cfg.planner.model, "gemini-pro");
    }

    #[test]
    fn api_key_falls_back_and_blank_is_unset() {
        let cfg = config(&[(GEMINI_API_KEY_ENV, "  "), (FALLBACK_API_KEY_ENV, "k2")]).unwrap();
        assert_eq!(cfg.planner.api_key.as_deref(), Some("k2"));
    }

    #[test]
    fn bad_streak_mode_is_rejected() {
        let err = config(&[(STREAK_MODE_ENV, "weekly")]).unwrap_err();
        assert_eq!(err.code(), "CONFIG/STREAK_MODE");
    }
}
