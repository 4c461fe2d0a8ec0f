use std::fs;
use std::io;

use thiserror::Error;
use tracing::debug;

use crate::config::FetchConfig;
use crate::sources::{Location, resolve_location};

const ACCEPT: &str = "text/calendar, application/json;q=0.9, */*;q=0.5";

/// Why one source produced no payload. Recorded in the run report, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{source_ref}: unavailable ({reason})")]
    Unavailable { source_ref: String, reason: String },

    #[error("{source_ref}: the portal asks for authentication")]
    AuthRequired { source_ref: String },

    #[error("{source_ref}: timed out")]
    Timeout { source_ref: String },
}

impl FetchError {
    pub fn source_ref(&self) -> &str {
        match self {
            Self::Unavailable { source_ref, .. }
            | Self::AuthRequired { source_ref }
            | Self::Timeout { source_ref } => source_ref,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}

/// Raw payload retrieval for one source reference.
pub trait Fetch: Sync {
    fn fetch(&self, source: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP client for the portal, also reading local dump files.
///
/// Headers and the session cookie come from the `FetchConfig` it is built
/// with; nothing is shared between fetchers.
pub struct HttpFetcher {
    config: FetchConfig,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build();
        HttpFetcher { config, agent }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url`; `source` names the reference in errors.
    pub fn get(&self, source: &str, url: &str) -> Result<String, FetchError> {
        let mut request = self.agent.get(url).set("Accept", ACCEPT);
        if let Some(cookie) = self.config.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            request = request.set("Cookie", cookie.trim());
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(401 | 403, _)) => {
                return Err(FetchError::AuthRequired {
                    source_ref: source.to_string(),
                });
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(unavailable(source, format!("HTTP {code}")));
            }
            Err(ureq::Error::Transport(transport)) => {
                let timed_out = std::error::Error::source(&transport)
                    .and_then(|e| e.downcast_ref::<io::Error>())
                    .is_some_and(is_timeout);
                return Err(if timed_out {
                    FetchError::Timeout {
                        source_ref: source.to_string(),
                    }
                } else {
                    unavailable(source, transport.to_string())
                });
            }
        };

        if response.status() != 200 {
            return Err(unavailable(source, format!("HTTP {}", response.status())));
        }
        let body = response.into_string().map_err(|e| {
            if is_timeout(&e) {
                FetchError::Timeout {
                    source_ref: source.to_string(),
                }
            } else {
                unavailable(source, e.to_string())
            }
        })?;
        if body.trim().is_empty() {
            return Err(unavailable(source, "empty body".to_string()));
        }
        debug!(source, url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, source: &str) -> Result<String, FetchError> {
        match resolve_location(source, &self.config) {
            Location::Remote(url) => self.get(source, &url),
            Location::Local(path) => read_dump(source, &path),
        }
    }
}

/// Read a saved payload from disk.
pub fn read_dump(source: &str, path: &std::path::Path) -> Result<String, FetchError> {
    let body = fs::read_to_string(path).map_err(|e| unavailable(source, e.to_string()))?;
    if body.trim().is_empty() {
        return Err(unavailable(source, "empty file".to_string()));
    }
    Ok(body)
}

fn unavailable(source: &str, reason: String) -> FetchError {
    FetchError::Unavailable {
        source_ref: source.to_string(),
        reason,
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
