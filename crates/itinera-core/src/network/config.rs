use serde::{Deserialize, Serialize};

/// HTTP settings shared by every provider client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u32,
    /// Request timeout in seconds
    pub request_timeout_seconds: u32,
    /// User agent sent with every request
    pub user_agent: Option<String>,
    /// Hosts that may be reached over plain HTTP (localhost is always allowed)
    pub insecure_hosts: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            request_timeout_seconds: 120,
            user_agent: None,
            insecure_hosts: vec![],
        }
    }
}

impl NetworkConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout_seconds: env_u32("ITINERA_CONNECT_TIMEOUT")
                .unwrap_or(defaults.connect_timeout_seconds),
            request_timeout_seconds: env_u32("ITINERA_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout_seconds),
            user_agent: std::env::var("ITINERA_USER_AGENT").ok(),
            insecure_hosts: defaults.insecure_hosts,
        }
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("itinera/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn allows_plain_http(&self, host: &str) -> bool {
        if host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]" {
            return true;
        }
        self.insecure_hosts.iter().any(|h| {
            host == h || host.ends_with(&format!(".{h}"))
        })
    }

    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        if self.connect_timeout_seconds == 0 || self.request_timeout_seconds == 0 {
            return Err(NetworkConfigError::ZeroTimeout);
        }
        if self.connect_timeout_seconds > self.request_timeout_seconds {
            return Err(NetworkConfigError::ConnectExceedsRequest {
                connect: self.connect_timeout_seconds,
                request: self.request_timeout_seconds,
            });
        }
        Ok(())
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkConfigError {
    #[error("Timeouts must be greater than zero")]
    ZeroTimeout,
    #[error("Connect timeout ({connect}s) exceeds request timeout ({request}s)")]
    ConnectExceedsRequest { connect: u32, request: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NetworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = NetworkConfig {
            request_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NetworkConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_connect_longer_than_request_rejected() {
        let config = NetworkConfig {
            connect_timeout_seconds: 60,
            request_timeout_seconds: 30,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NetworkConfigError::ConnectExceedsRequest { .. })
        ));
    }

    #[test]
    fn test_plain_http_hosts() {
        let config = NetworkConfig {
            insecure_hosts: vec!["mock.internal".into()],
            ..Default::default()
        };

        assert!(config.allows_plain_http("localhost"));
        assert!(config.allows_plain_http("127.0.0.1"));
        assert!(config.allows_plain_http("mock.internal"));
        assert!(config.allows_plain_http("api.mock.internal"));
        assert!(!config.allows_plain_http("example.com"));
        assert!(!config.allows_plain_http("notmock.internal"));
    }

    #[test]
    fn test_default_user_agent() {
        let ua = NetworkConfig::default().user_agent();
        assert!(ua.starts_with("itinera/"));
    }
}
