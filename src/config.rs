//! Session bootstrap: endpoint, region and credential resolution.

use crate::error::ConfigError;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use std::fmt;
use std::time::Duration;

/// Region used when neither the config nor the environment names one.
pub const DEFAULT_REGION: &str = "eu-west-1";

pub(crate) const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub(crate) const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub(crate) const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub(crate) const ENV_REGION: &str = "AWS_REGION";
pub(crate) const ENV_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";

/// Name reported by the static credentials provider.
const PROVIDER_NAME: &str = "kinesis-facade";

/// Access key pair used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    fn into_provider(self) -> aws_sdk_kinesis::config::Credentials {
        aws_sdk_kinesis::config::Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            self.session_token,
            None,
            PROVIDER_NAME,
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("has_session_token", &self.session_token.is_some())
            .finish()
    }
}

/// Where credentials come from.
#[derive(Clone, Debug, Default)]
pub enum CredentialSource {
    /// `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and optionally
    /// `AWS_SESSION_TOKEN`, read once at session construction.
    #[default]
    Environment,
    /// Explicit values.
    Static(Credentials),
}

impl CredentialSource {
    fn resolve<F>(&self, lookup: &F) -> Result<Credentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            CredentialSource::Static(creds) => {
                if creds.access_key_id.is_empty() {
                    return Err(ConfigError::MissingCredentials(ENV_ACCESS_KEY_ID));
                }
                if creds.secret_access_key.is_empty() {
                    return Err(ConfigError::MissingCredentials(ENV_SECRET_ACCESS_KEY));
                }
                Ok(creds.clone())
            }
            CredentialSource::Environment => {
                let access_key_id = non_empty(lookup, ENV_ACCESS_KEY_ID)
                    .ok_or(ConfigError::MissingCredentials(ENV_ACCESS_KEY_ID))?;
                let secret_access_key = non_empty(lookup, ENV_SECRET_ACCESS_KEY)
                    .ok_or(ConfigError::MissingCredentials(ENV_SECRET_ACCESS_KEY))?;
                Ok(Credentials {
                    access_key_id,
                    secret_access_key,
                    session_token: non_empty(lookup, ENV_SESSION_TOKEN),
                })
            }
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

/// Everything needed to build a [`Session`].
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Alternate endpoint (e.g. a local test double). `None` uses the
    /// provider's public regional endpoint.
    pub endpoint: Option<String>,
    /// Region for signing and endpoint resolution.
    pub region: Option<String>,
    pub credentials: CredentialSource,
    /// Per-operation timeout.
    pub timeout: Option<Duration>,
}

/// A bound connection context toward the stream service.
///
/// Cheap to clone; clones share the SDK client and its connection pool.
#[derive(Clone)]
pub struct Session {
    pub(crate) client: aws_sdk_kinesis::Client,
    endpoint: Option<String>,
    region: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish()
    }
}

impl Session {
    /// Create a session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Build a session from the process environment and an optional endpoint.
    pub async fn from_env(endpoint: Option<&str>) -> Result<Self, ConfigError> {
        Self::from_config(SessionConfig {
            endpoint: endpoint.map(str::to_string),
            ..SessionConfig::default()
        })
        .await
    }

    /// Build a session from an explicit config, reading the process
    /// environment for anything the config leaves to it.
    pub async fn from_config(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::from_config_with(config, |key| std::env::var(key).ok()).await
    }

    pub(crate) async fn from_config_with<F>(
        config: SessionConfig,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = match config.region {
            Some(region) => region,
            None => non_empty(&lookup, ENV_REGION)
                .or_else(|| non_empty(&lookup, ENV_DEFAULT_REGION))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };
        if region.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(region));
        }

        let credentials = config.credentials.resolve(&lookup)?;
        if let Some(endpoint) = &config.endpoint {
            validate_endpoint(endpoint)?;
        }

        // Retries are disabled: a failed attempt is surfaced immediately.
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(credentials.into_provider())
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = config.timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        let sdk_config = loader.load().await;

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = ?config.endpoint, region = %region, "stream session created");

        Ok(Session {
            client: aws_sdk_kinesis::Client::new(&sdk_config),
            endpoint: config.endpoint,
            region,
        })
    }

    /// The endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Overrides must be absolute `http`/`https` URLs with a host.
fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let uri = endpoint
        .parse::<http::Uri>()
        .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                endpoint, other
            )))
        }
        None => {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: missing scheme",
                endpoint
            )))
        }
    }

    if uri.host().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidEndpoint(format!(
            "{}: missing host",
            endpoint
        )));
    }
    Ok(())
}

/// Builder for configuring a [`Session`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirect all traffic to an alternate endpoint.
    ///
    /// Plain HTTP is accepted here; only use it for trusted local testing.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Use explicit credentials instead of the environment.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = CredentialSource::Static(credentials);
        self
    }

    /// Set the per-operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Build the session. No network calls are made.
    pub async fn build(self) -> Result<Session, ConfigError> {
        Session::from_config(self.config).await
    }
}
