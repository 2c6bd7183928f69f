//! # Remote Parser Module
//!
//! ## Purpose
//! Remote LLM-backed implementation of the [`SchoolQueryParser`] capability,
//! plus the fallback composition the search feature actually calls: try the
//! remote collaborator first, fall back to the local heuristic parser
//! transparently when it fails.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text query, remote endpoint configuration
//! - **Output**: Sanitized `ParsedFilter` plus a `ParserSource` indicator
//! - **Failure semantics**: network errors, timeouts, HTTP errors and
//!   invalid JSON all degrade to local matching; the search feature never
//!   hard-fails because the collaborator is down
//!
//! The remote call supports a single timeout-based abort, not arbitrary
//! cancellation. Every remote payload passes [`ParsedFilter::sanitize`]
//! before use: out-of-domain values are dropped, never trusted.

use crate::config::{ParserConfig, RemoteParserConfig};
use crate::errors::{MatchError, Result};
use crate::parser::{LocalQueryParser, ParsedFilter, ParserSource, SchoolQueryParser};
use async_trait::async_trait;
use std::time::Duration;

/// Remote LLM parser collaborator behind the common capability interface.
pub struct RemoteQueryParser {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl RemoteQueryParser {
    pub fn new(config: &RemoteParserConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(MatchError::Http)?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl SchoolQueryParser for RemoteQueryParser {
    async fn parse(&self, query: &str) -> Result<ParsedFilter> {
        let mut request = self
            .client
            .post(&self.api_url)
            .json(&serde_json::json!({ "query": query }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| MatchError::RemoteTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??
            .error_for_status()?;

        let payload = tokio::time::timeout(self.timeout, response.json::<serde_json::Value>())
            .await
            .map_err(|_| MatchError::RemoteTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        let mut filter: ParsedFilter =
            serde_json::from_value(payload).map_err(|e| MatchError::RemoteParser {
                details: format!("response is not a valid filter payload: {}", e),
            })?;
        filter.sanitize();
        Ok(filter)
    }

    fn source(&self) -> ParserSource {
        ParserSource::Remote
    }
}

/// Try-remote-then-local composition. This is the entry point the search
/// feature uses; both branches return a sanitized filter.
pub struct FallbackParser {
    remote: Option<RemoteQueryParser>,
    local: LocalQueryParser,
    max_query_length: usize,
}

impl FallbackParser {
    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        let remote = if config.remote.enabled {
            Some(RemoteQueryParser::new(&config.remote)?)
        } else {
            None
        };
        Ok(Self {
            remote,
            local: LocalQueryParser::new()?,
            max_query_length: config.max_query_length,
        })
    }

    /// Parse a query, reporting which parser produced the result. Remote
    /// failures are logged and absorbed, never surfaced as hard errors.
    pub async fn parse(&self, query: &str) -> (ParsedFilter, ParserSource) {
        let query = self.cap(query);

        if let Some(remote) = &self.remote {
            match remote.parse(&query).await {
                Ok(filter) => return (filter, ParserSource::Remote),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        category = e.category(),
                        "remote parser failed, using local matching"
                    );
                }
            }
            return (self.local.parse_query(&query), ParserSource::LocalFallback);
        }

        (self.local.parse_query(&query), ParserSource::Local)
    }

    /// Calling-layer length cap, applied on a character boundary.
    fn cap(&self, query: &str) -> String {
        if query.chars().count() > self.max_query_length {
            tracing::debug!(cap = self.max_query_length, "query truncated to length cap");
            query.chars().take(self.max_query_length).collect()
        } else {
            query.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_config(url: String) -> ParserConfig {
        ParserConfig {
            remote: RemoteParserConfig {
                enabled: true,
                api_url: url,
                api_key: None,
                timeout_ms: 2000,
            },
            ..Config::default().parser
        }
    }

    #[tokio::test]
    async fn remote_payload_is_sanitized_before_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cities": ["Almaty", "Gotham"],
                "types": ["Private", "Wizarding"],
                "rating": 9.5,
                "priceRange": [300000, 100]
            })))
            .mount(&server)
            .await;

        let config = remote_config(format!("{}/parse", server.uri()));
        let parser = RemoteQueryParser::new(&config.remote).unwrap();
        let filter = parser.parse("any query").await.unwrap();

        assert_eq!(filter.cities, vec!["Almaty"]);
        assert_eq!(filter.types, vec!["Private"]);
        assert_eq!(filter.rating, Some(5.0));
        assert_eq!(filter.price_range, (100, 300_000));
    }

    #[tokio::test]
    async fn server_error_falls_back_to_local_matching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let parser = FallbackParser::from_config(&remote_config(server.uri())).unwrap();
        let (filter, source) = parser.parse("частная школа в алматы").await;

        assert_eq!(source, ParserSource::LocalFallback);
        assert!(source.is_fallback());
        assert_eq!(filter.cities, vec!["Almaty"]);
        assert!(filter.types.iter().any(|t| t == "Private"));
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_local_matching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let parser = FallbackParser::from_config(&remote_config(server.uri())).unwrap();
        let (_, source) = parser.parse("школа в астане").await;
        assert_eq!(source, ParserSource::LocalFallback);
    }

    #[tokio::test]
    async fn disabled_remote_goes_straight_to_local() {
        let parser = FallbackParser::from_config(&Config::default().parser).unwrap();
        let (filter, source) = parser.parse("school in Shymkent").await;
        assert_eq!(source, ParserSource::Local);
        assert_eq!(filter.cities, vec!["Shymkent"]);
    }

    #[tokio::test]
    async fn oversized_queries_are_capped_not_rejected() {
        let parser = FallbackParser::from_config(&Config::default().parser).unwrap();
        let huge = "алматы ".repeat(1000);
        let (filter, _) = parser.parse(&huge).await;
        assert_eq!(filter.cities, vec!["Almaty"]);
    }
}
