//! Error types and the provider-error classification policy.

use aws_sdk_kinesis::config::http::HttpResponse;
use aws_sdk_kinesis::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt;
use thiserror::Error;

/// Error raised while bootstrapping a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing credentials: environment variable {0} is not set")]
    MissingCredentials(&'static str),
    #[error("invalid region: {0:?}")]
    InvalidRegion(String),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Structured error kinds reported by the stream service.
///
/// Only [`ResourceInUse`](ProviderErrorKind::ResourceInUse) gets special
/// treatment (see [`classify`]); every other kind is surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    ResourceInUse,
    ResourceNotFound,
    LimitExceeded,
    ProvisionedThroughputExceeded,
    InvalidArgument,
    ExpiredIterator,
    ExpiredNextToken,
    AccessDenied,
    KmsThrottling,
    Validation,
    InternalFailure,
    Throttling,
    Unknown(String),
}

impl ProviderErrorKind {
    /// Parse an error code as reported by the service.
    ///
    /// The code may carry a namespace prefix (`com.amazonaws.kinesis#...`);
    /// only the part after the last `#` is significant.
    pub fn parse(type_name: &str) -> Self {
        let name = type_name.rsplit('#').next().unwrap_or(type_name);
        let name = name.split(':').next().unwrap_or(name);
        match name {
            "ResourceInUseException" => ProviderErrorKind::ResourceInUse,
            "ResourceNotFoundException" => ProviderErrorKind::ResourceNotFound,
            "LimitExceededException" => ProviderErrorKind::LimitExceeded,
            "ProvisionedThroughputExceededException" => {
                ProviderErrorKind::ProvisionedThroughputExceeded
            }
            "InvalidArgumentException" => ProviderErrorKind::InvalidArgument,
            "ExpiredIteratorException" => ProviderErrorKind::ExpiredIterator,
            "ExpiredNextTokenException" => ProviderErrorKind::ExpiredNextToken,
            "AccessDeniedException" => ProviderErrorKind::AccessDenied,
            "KMSThrottlingException" => ProviderErrorKind::KmsThrottling,
            "ValidationException" => ProviderErrorKind::Validation,
            "InternalFailure" | "InternalFailureException" => ProviderErrorKind::InternalFailure,
            "ThrottlingException" => ProviderErrorKind::Throttling,
            other => ProviderErrorKind::Unknown(other.to_string()),
        }
    }

    /// Wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ProviderErrorKind::ResourceInUse => "ResourceInUseException",
            ProviderErrorKind::ResourceNotFound => "ResourceNotFoundException",
            ProviderErrorKind::LimitExceeded => "LimitExceededException",
            ProviderErrorKind::ProvisionedThroughputExceeded => {
                "ProvisionedThroughputExceededException"
            }
            ProviderErrorKind::InvalidArgument => "InvalidArgumentException",
            ProviderErrorKind::ExpiredIterator => "ExpiredIteratorException",
            ProviderErrorKind::ExpiredNextToken => "ExpiredNextTokenException",
            ProviderErrorKind::AccessDenied => "AccessDeniedException",
            ProviderErrorKind::KmsThrottling => "KMSThrottlingException",
            ProviderErrorKind::Validation => "ValidationException",
            ProviderErrorKind::InternalFailure => "InternalFailure",
            ProviderErrorKind::Throttling => "ThrottlingException",
            ProviderErrorKind::Unknown(name) => name.as_str(),
        }
    }

    /// Whether this is the create-conflict kind that makes creation idempotent.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProviderErrorKind::ResourceInUse)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured error returned by the stream service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// HTTP status of the failed call.
    pub status: u16,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    /// Build an error for a failed response that carried no error code.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("Unexpected status {}", status)
        } else {
            body.trim().to_string()
        };
        Self::new(ProviderErrorKind::Unknown(format!("HTTP{}", status)), message, status)
    }
}

/// Raw outcome of a single failed remote call, before classification.
#[derive(Debug, Error)]
pub enum CallError {
    /// Structured error returned by the service.
    #[error(transparent)]
    Provider(ProviderError),

    /// Connection, dispatch or timeout failure.
    #[error("network error: {0}")]
    Transport(String),

    /// The request could not be built locally.
    #[error("request error: {0}")]
    Request(String),

    /// The response could not be understood.
    #[error("decode error: {0}")]
    Decode(String),
}

impl<E> From<SdkError<E, HttpResponse>> for CallError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E, HttpResponse>) -> Self {
        match &err {
            SdkError::ServiceError(ctx) => {
                let status = ctx.raw().status().as_u16();
                let service = ctx.err();
                let provider = match service.code() {
                    Some(code) => ProviderError::new(
                        ProviderErrorKind::parse(code),
                        service.message().unwrap_or_default(),
                        status,
                    ),
                    None => {
                        let body = ctx
                            .raw()
                            .body()
                            .bytes()
                            .map(String::from_utf8_lossy)
                            .unwrap_or_default();
                        ProviderError::from_status(status, &body)
                    }
                };
                CallError::Provider(provider)
            }
            SdkError::ConstructionFailure(_) => {
                CallError::Request(DisplayErrorContext(&err).to_string())
            }
            SdkError::ResponseError(_) => CallError::Decode(DisplayErrorContext(&err).to_string()),
            _ => CallError::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

/// Main error type for stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("AWS error encountered: {0}")]
    Provider(#[source] ProviderError),

    #[error("network error: {0}")]
    Transport(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("stream {stream} has no shards")]
    NoShards { stream: String },

    #[error("stream {stream} did not become active after {attempts} attempts")]
    WaitExhausted { stream: String, attempts: u32 },
}

impl StreamError {
    /// The wrapped provider error, if this is one.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            StreamError::Provider(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this wraps a provider error of the given kind.
    pub fn is_provider_kind(&self, kind: &ProviderErrorKind) -> bool {
        self.provider_error().is_some_and(|err| &err.kind == kind)
    }
}

/// Decide whether a failed remote call is surfaced to the caller.
///
/// - a provider error of the already-exists kind is suppressed (`None`)
/// - any other provider error is wrapped as [`StreamError::Provider`]
/// - unstructured errors pass through unchanged
pub fn classify(err: CallError) -> Option<StreamError> {
    match err {
        CallError::Provider(err) if err.kind.is_already_exists() => {
            #[cfg(feature = "tracing")]
            tracing::debug!(message = %err.message, "suppressing already-exists error");
            None
        }
        CallError::Provider(err) => Some(StreamError::Provider(err)),
        CallError::Transport(msg) => Some(StreamError::Transport(msg)),
        CallError::Request(msg) => Some(StreamError::Request(msg)),
        CallError::Decode(msg) => Some(StreamError::Decode(msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_kinesis::operation::create_stream::CreateStreamError;

    fn provider(kind: ProviderErrorKind, message: &str) -> CallError {
        CallError::Provider(ProviderError::new(kind, message, 400))
    }

    #[test]
    fn test_already_exists_is_suppressed() {
        let err = provider(ProviderErrorKind::ResourceInUse, "Stream s already exists");
        assert!(classify(err).is_none());
    }

    #[test]
    fn test_other_provider_kinds_are_wrapped() {
        let kinds = [
            ProviderErrorKind::ResourceNotFound,
            ProviderErrorKind::LimitExceeded,
            ProviderErrorKind::ProvisionedThroughputExceeded,
            ProviderErrorKind::AccessDenied,
            ProviderErrorKind::Throttling,
            ProviderErrorKind::Unknown("SomethingNew".to_string()),
        ];

        for kind in kinds {
            let err = classify(provider(kind.clone(), "boom")).unwrap();
            assert!(err.is_provider_kind(&kind));
            let text = err.to_string();
            assert!(text.starts_with("AWS error encountered: "), "{}", text);
            assert!(text.contains("boom"), "{}", text);
            assert!(text.contains(kind.as_str()), "{}", text);
        }
    }

    #[test]
    fn test_decode_error_passes_through() {
        let err = classify(CallError::Decode("bad json".to_string())).unwrap();
        assert!(matches!(err, StreamError::Decode(ref m) if m == "bad json"));
        assert!(err.provider_error().is_none());
    }

    #[test]
    fn test_parse_kind_strips_namespace() {
        assert_eq!(
            ProviderErrorKind::parse("com.amazonaws.kinesis.v20131202#ResourceInUseException"),
            ProviderErrorKind::ResourceInUse
        );
        assert_eq!(
            ProviderErrorKind::parse("ResourceNotFoundException"),
            ProviderErrorKind::ResourceNotFound
        );
        assert_eq!(
            ProviderErrorKind::parse("KMSThrottlingException"),
            ProviderErrorKind::KmsThrottling
        );
        assert_eq!(
            ProviderErrorKind::parse("Frobnicated"),
            ProviderErrorKind::Unknown("Frobnicated".to_string())
        );
    }

    #[test]
    fn test_only_resource_in_use_is_already_exists() {
        assert!(ProviderErrorKind::ResourceInUse.is_already_exists());
        assert!(!ProviderErrorKind::ResourceNotFound.is_already_exists());
        assert!(!ProviderErrorKind::Unknown("ResourceInUse".to_string()).is_already_exists());
    }

    #[test]
    fn test_from_status_without_body() {
        let err = ProviderError::from_status(502, "  ");
        assert_eq!(err.status, 502);
        assert_eq!(err.message, "Unexpected status 502");
        assert_eq!(err.kind, ProviderErrorKind::Unknown("HTTP502".to_string()));
    }

    #[test]
    fn test_timeout_is_transport_error() {
        let err: SdkError<CreateStreamError, HttpResponse> = SdkError::timeout_error("slow");
        let call = CallError::from(err);
        assert!(matches!(call, CallError::Transport(_)), "{:?}", call);
        assert!(matches!(classify(call), Some(StreamError::Transport(_))));
    }

    #[test]
    fn test_construction_failure_is_request_error() {
        let err: SdkError<CreateStreamError, HttpResponse> =
            SdkError::construction_failure("missing stream name");
        assert!(matches!(CallError::from(err), CallError::Request(_)));
    }
}
