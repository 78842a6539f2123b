use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;
use url::Url;

use super::config::NetworkConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Plain HTTP refused for host {0}")]
    InsecureUrl(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP client shared by the provider integrations.
///
/// Requests must target an absolute URL with a host; plain HTTP is only sent
/// to localhost or hosts listed in [`NetworkConfig::insecure_hosts`].
#[derive(Debug, Clone)]
pub struct ProviderClient {
    config: NetworkConfig,
    inner: Client,
}

impl ProviderClient {
    pub fn new(config: NetworkConfig) -> ClientResult<Self> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(u64::from(config.connect_timeout_seconds)))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_seconds)))
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self { config, inner })
    }

    fn validate_request(&self, url: &str) -> ClientResult<Url> {
        let parsed = Url::parse(url)?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ClientError::InvalidUrl("No host in URL".to_string()))?;

        match parsed.scheme() {
            "https" => Ok(parsed),
            "http" if self.config.allows_plain_http(host) => Ok(parsed),
            "http" => Err(ClientError::InsecureUrl(host.to_string())),
            other => Err(ClientError::InvalidUrl(format!("unsupported scheme {other}"))),
        }
    }

    pub fn request(&self, method: Method, url: &str) -> ClientResult<RequestBuilder> {
        let url = self.validate_request(url)?;
        Ok(self.inner.request(method, url))
    }

    pub fn get(&self, url: &str) -> ClientResult<RequestBuilder> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> ClientResult<RequestBuilder> {
        self.request(Method::POST, url)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

/// Joins `path` onto `base`, tolerating a trailing slash on either side.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(insecure_hosts: Vec<String>) -> ProviderClient {
        let config = NetworkConfig {
            insecure_hosts,
            ..Default::default()
        };
        ProviderClient::new(config).unwrap()
    }

    #[test]
    fn test_https_allowed() {
        let client = make_client(vec![]);
        assert!(client.validate_request("https://places.googleapis.com/v1").is_ok());
    }

    #[test]
    fn test_plain_http_to_localhost_allowed() {
        let client = make_client(vec![]);

        assert!(client.validate_request("http://localhost:8080/api").is_ok());
        assert!(client.validate_request("http://127.0.0.1:3000/").is_ok());
    }

    #[test]
    fn test_plain_http_to_listed_host_allowed() {
        let client = make_client(vec!["stub.internal".into()]);

        assert!(client.validate_request("http://stub.internal/flights").is_ok());
        assert!(matches!(
            client.validate_request("http://example.com/flights"),
            Err(ClientError::InsecureUrl(ref h)) if h == "example.com"
        ));
    }

    #[test]
    fn test_rejects_invalid_url() {
        let client = make_client(vec![]);

        assert!(matches!(
            client.validate_request("not-a-url"),
            Err(ClientError::UrlParse(_))
        ));
    }

    #[test]
    fn test_rejects_url_without_host() {
        let client = make_client(vec![]);

        assert!(matches!(
            client.validate_request("file:///etc/passwd"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a.io/", "/v1/x"), "https://a.io/v1/x");
        assert_eq!(join_url("https://a.io", "v1/x"), "https://a.io/v1/x");
    }

    #[test]
    fn test_client_config_access() {
        let client = make_client(vec!["x.internal".into()]);
        assert_eq!(client.config().insecure_hosts, vec!["x.internal".to_string()]);
    }
}
