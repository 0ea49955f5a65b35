//! Core value types exchanged with the stream service.

use bytes::Bytes;
use std::time::{Duration, SystemTime};

/// A stream's name and desired shard count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamIdentity {
    pub name: String,
    pub shard_count: u32,
}

impl StreamIdentity {
    pub fn new(name: impl Into<String>, shard_count: u32) -> Self {
        Self {
            name: name.into(),
            shard_count,
        }
    }
}

/// A single record read from a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Record {
    /// Key the service used to route this record to its shard.
    pub partition_key: String,
    /// The raw payload bytes.
    pub data: Bytes,
    /// Service-assigned position within the shard.
    pub sequence_number: String,
    /// Approximate time the service accepted the record.
    pub approximate_arrival_timestamp: Option<SystemTime>,
}

impl From<&aws_sdk_kinesis::types::Record> for Record {
    fn from(record: &aws_sdk_kinesis::types::Record) -> Self {
        Record {
            partition_key: record.partition_key().to_string(),
            data: Bytes::copy_from_slice(record.data().as_ref()),
            sequence_number: record.sequence_number().to_string(),
            approximate_arrival_timestamp: record
                .approximate_arrival_timestamp()
                .and_then(|ts| SystemTime::try_from(ts.clone()).ok()),
        }
    }
}

/// A shard as returned by the shard listing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Shard {
    pub shard_id: String,
    pub parent_shard_id: Option<String>,
}

impl From<&aws_sdk_kinesis::types::Shard> for Shard {
    fn from(shard: &aws_sdk_kinesis::types::Shard) -> Self {
        Shard {
            shard_id: shard.shard_id().to_string(),
            parent_shard_id: shard.parent_shard_id().map(str::to_string),
        }
    }
}

/// Polling schedule used while waiting for a new stream to become active.
#[derive(Clone, Debug)]
pub struct WaitConfig {
    /// Delay between describe calls.
    pub delay: Duration,
    /// Maximum number of describe calls. At least one call is always made.
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            max_attempts: 18,
        }
    }
}

impl WaitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Number of describe calls actually made.
    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
