use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub graph: GraphConfig,
}

/// Where chat logs come from
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the chat server
    pub base_url: String,
    /// CSRF token sent with every request, if the server requires one
    pub csrf_token: Option<String>,
    /// Character display name (needed to fetch individual chats)
    pub character_name: Option<String>,
    /// Character avatar file name, the server-side key for a character's chats
    pub character_avatar: Option<String>,
    /// Whether the chats are group chats (no metadata header record)
    pub group_chat: bool,
    /// Local directory of `.jsonl` chat files; takes precedence over the server
    pub chats_dir: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Checkpoint path highlighting parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Thickness of the edge nearest to the checkpoint
    pub highlight_thickness: f64,
    /// Upper bound for highlighted edge thickness
    pub highlight_max_thickness: f64,
    /// Thickness added per step away from the checkpoint
    pub highlight_thickness_step: f64,
    /// z-index of the edge nearest to the checkpoint
    pub highlight_z_index: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let source = SourceConfig {
            base_url: env::var("TIMELINES_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            csrf_token: non_empty_var("TIMELINES_CSRF_TOKEN"),
            character_name: non_empty_var("TIMELINES_CHARACTER_NAME"),
            character_avatar: non_empty_var("TIMELINES_CHARACTER_AVATAR"),
            group_chat: env::var("TIMELINES_GROUP_CHAT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            chats_dir: non_empty_var("TIMELINES_CHATS_DIR").map(PathBuf::from),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let defaults = GraphConfig::default();
        let graph = GraphConfig {
            highlight_thickness: env::var("HIGHLIGHT_THICKNESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.highlight_thickness),
            highlight_max_thickness: env::var("HIGHLIGHT_MAX_THICKNESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.highlight_max_thickness),
            highlight_thickness_step: env::var("HIGHLIGHT_THICKNESS_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.highlight_thickness_step),
            highlight_z_index: env::var("HIGHLIGHT_Z_INDEX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.highlight_z_index),
        };
        graph.validate()?;

        Ok(Config {
            source,
            logging,
            request,
            graph,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Largest accepted base z-index; keeps every path's z-index within `i32`
pub const MAX_BASE_Z_INDEX: u32 = i32::MAX as u32 / 2;

impl GraphConfig {
    /// Reject thickness settings that cannot produce a sane highlight ramp
    pub fn validate(&self) -> Result<(), AppError> {
        if self.highlight_thickness.is_nan() || self.highlight_thickness <= 0.0 {
            return Err(AppError::Config {
                message: format!(
                    "HIGHLIGHT_THICKNESS must be positive, got {}",
                    self.highlight_thickness
                ),
            });
        }
        if !self.highlight_max_thickness.is_finite()
            || self.highlight_max_thickness < self.highlight_thickness
        {
            return Err(AppError::Config {
                message: format!(
                    "HIGHLIGHT_MAX_THICKNESS ({}) is below HIGHLIGHT_THICKNESS ({})",
                    self.highlight_max_thickness, self.highlight_thickness
                ),
            });
        }
        if !self.highlight_thickness_step.is_finite() || self.highlight_thickness_step < 0.0 {
            return Err(AppError::Config {
                message: format!(
                    "HIGHLIGHT_THICKNESS_STEP must not be negative, got {}",
                    self.highlight_thickness_step
                ),
            });
        }
        if self.highlight_z_index > MAX_BASE_Z_INDEX {
            return Err(AppError::Config {
                message: format!(
                    "HIGHLIGHT_Z_INDEX must be at most {}, got {}",
                    MAX_BASE_Z_INDEX, self.highlight_z_index
                ),
            });
        }
        Ok(())
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            highlight_thickness: 4.0,
            highlight_max_thickness: 6.0,
            highlight_thickness_step: 0.1,
            highlight_z_index: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_config_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.highlight_thickness, 4.0);
        assert_eq!(config.highlight_max_thickness, 6.0);
        assert_eq!(config.highlight_thickness_step, 0.1);
        assert_eq!(config.highlight_z_index, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_graph_config_rejects_inverted_bounds() {
        let config = GraphConfig {
            highlight_max_thickness: 2.0,
            ..GraphConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HIGHLIGHT_MAX_THICKNESS"));
    }

    #[test]
    fn test_graph_config_rejects_negative_step() {
        let config = GraphConfig {
            highlight_thickness_step: -0.5,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_graph_config_rejects_zero_thickness() {
        let config = GraphConfig {
            highlight_thickness: 0.0,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_graph_config_rejects_non_finite_values() {
        let config = GraphConfig {
            highlight_max_thickness: f64::NAN,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GraphConfig {
            highlight_thickness_step: f64::NAN,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_graph_config_rejects_z_index_without_headroom() {
        let config = GraphConfig {
            highlight_z_index: u32::MAX,
            ..GraphConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HIGHLIGHT_Z_INDEX"));

        let config = GraphConfig {
            highlight_z_index: MAX_BASE_Z_INDEX,
            ..GraphConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_request_config_default() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_ms, 30000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 1000);
    }
}
