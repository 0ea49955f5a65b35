//! Kinesis Facade
//!
//! A minimal client for shard-partitioned, append-only stream services that
//! speak the Kinesis API (AWS Kinesis itself, or a local double such as
//! LocalStack). Requests go through `aws-sdk-kinesis`; this crate adds
//! idempotent creation, a single-shard consume and one error policy.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kinesis_facade::{Session, StreamClient, StreamIdentity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
//!     let session = Session::builder()
//!         .endpoint("http://localhost:4566")
//!         .build()
//!         .await?;
//!     let client = StreamClient::new(session);
//!
//!     // Create a stream (succeeds if it already exists)
//!     client
//!         .create_stream_if_not_exists(&StreamIdentity::new("my-stream", 1))
//!         .await?;
//!
//!     // Append a record
//!     client.put_record("my-stream", "key", b"data").await?;
//!
//!     // Read from the start of the stream
//!     for record in client.consume_records("my-stream").await? {
//!         println!("{}: {} bytes", record.partition_key, record.data.len());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Limitations
//!
//! - Only single-shard streams are supported; consumption reads the first
//!   listed shard.
//! - No cursor is kept between calls: every consume starts again from the
//!   trim horizon.
//! - No retries. The only error swallowed is the service's
//!   `ResourceInUseException`, which makes stream creation idempotent.

mod client;
mod config;
mod error;
mod types;

pub use client::StreamClient;
pub use config::{
    CredentialSource, Credentials, Session, SessionBuilder, SessionConfig, DEFAULT_REGION,
};
pub use error::{classify, CallError, ConfigError, ProviderError, ProviderErrorKind, StreamError};
pub use types::{Record, Shard, StreamIdentity, WaitConfig};
