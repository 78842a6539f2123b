use serde::{Deserialize, Serialize};

use crate::network::{NetworkConfig, NetworkConfigError};

/// OpenAI access used for the knowledge index and document extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used for itinerary extraction
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://places.googleapis.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AviationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for AviationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.api-ninjas.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightScheduleConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Value of the `X-RapidAPI-Host` header
    pub host: String,
}

impl Default for FlightScheduleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://aerodatabox.p.rapidapi.com".to_string(),
            host: "aerodatabox.p.rapidapi.com".to_string(),
        }
    }
}

/// Bounded retry for the flight schedule lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n * base_delay_ms` before the next try
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraConfig {
    pub database_path: String,
    pub network: NetworkConfig,
    pub openai: OpenAiConfig,
    pub places: PlacesConfig,
    pub aviation: AviationConfig,
    pub flights: FlightScheduleConfig,
    pub retry: RetryConfig,
}

impl Default for ItineraConfig {
    fn default() -> Self {
        Self {
            database_path: "itinera.db".to_string(),
            network: NetworkConfig::default(),
            openai: OpenAiConfig::default(),
            places: PlacesConfig::default(),
            aviation: AviationConfig::default(),
            flights: FlightScheduleConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ItineraConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            database_path: env_or("ITINERA_DB", defaults.database_path),
            network: NetworkConfig::from_env(),
            openai: OpenAiConfig {
                api_key: env_opt("OPENAI_API_KEY"),
                base_url: env_or("OPENAI_BASE_URL", defaults.openai.base_url),
                model: env_or("ITINERA_EXTRACTION_MODEL", defaults.openai.model),
            },
            places: PlacesConfig {
                api_key: env_opt("GOOGLE_PLACES_API_KEY"),
                ..defaults.places
            },
            aviation: AviationConfig {
                api_key: env_opt("AVIATION_API_KEY"),
                ..defaults.aviation
            },
            flights: FlightScheduleConfig {
                api_key: env_opt("FLIGHT_SCHEDULE_API_KEY"),
                host: env_or("FLIGHT_SCHEDULE_HOST", defaults.flights.host),
                ..defaults.flights
            },
            retry: defaults.retry,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        if self.openai.api_key.is_none() {
            return Err(ConfigError::MissingKey("OPENAI_API_KEY"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    MissingKey(&'static str),
    #[error("Retry policy must allow at least one attempt")]
    NoAttempts,
    #[error(transparent)]
    Network(#[from] NetworkConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ItineraConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.database_path, "itinera.db");
    }

    #[test]
    fn test_validate_requires_openai_key() {
        let config = ItineraConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKey("OPENAI_API_KEY"))
        ));

        let config = ItineraConfig {
            openai: OpenAiConfig {
                api_key: Some("sk-test".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = ItineraConfig {
            openai: OpenAiConfig {
                api_key: Some("sk-test".into()),
                ..Default::default()
            },
            retry: RetryConfig {
                max_attempts: 0,
                base_delay_ms: 1000,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoAttempts)));
    }
}
