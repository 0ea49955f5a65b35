//! Stream client: create-if-absent, put and consume.

use crate::config::Session;
use crate::error::{classify, CallError, StreamError};
use crate::types::{Record, Shard, StreamIdentity, WaitConfig};
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::{ShardIteratorType, StreamStatus};

/// Records requested per fetch.
const GET_RECORDS_LIMIT: i32 = 1;

/// A client bound to one stream-service session.
///
/// Every operation is a fresh round trip; nothing is cached between calls.
///
/// # Single-shard streams
///
/// [`consume_records`](Self::consume_records) reads only the first shard the
/// service lists. Streams with more than one shard are not supported: records
/// routed to other shards are never returned.
#[derive(Clone, Debug)]
pub struct StreamClient {
    session: Session,
    wait: WaitConfig,
}

impl StreamClient {
    /// Create a client over an existing session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            wait: WaitConfig::default(),
        }
    }

    /// Build a session from the environment and wrap it.
    ///
    /// `endpoint` redirects all traffic (e.g. to a local test double).
    pub async fn from_env(endpoint: Option<&str>) -> Result<Self, StreamError> {
        Ok(Self::new(Session::from_env(endpoint).await?))
    }

    /// Override the polling schedule used while waiting for a stream to
    /// become active.
    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Create the stream unless it exists, then wait until it is active.
    ///
    /// An already-exists conflict counts as success, both on create and while
    /// waiting. The wait has no deadline beyond
    /// [`WaitConfig::max_attempts`]; wrap the call in a timeout for a
    /// tighter bound.
    pub async fn create_stream_if_not_exists(
        &self,
        stream: &StreamIdentity,
    ) -> Result<(), StreamError> {
        validate_stream_name(&stream.name)?;
        let shard_count = i32::try_from(stream.shard_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(StreamError::InvalidInput("shard count must be positive"))?;

        let created = self
            .session
            .client
            .create_stream()
            .stream_name(&stream.name)
            .shard_count(shard_count)
            .send()
            .await;
        surface(created)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(stream = %stream.name, "waiting for stream to become active");

        self.wait_until_active(&stream.name, shard_count).await
    }

    /// Shorthand for [`create_stream_if_not_exists`](Self::create_stream_if_not_exists).
    pub async fn create_stream_if_not_exists_named(
        &self,
        name: &str,
        shard_count: u32,
    ) -> Result<(), StreamError> {
        self.create_stream_if_not_exists(&StreamIdentity::new(name, shard_count))
            .await
    }

    async fn wait_until_active(&self, name: &str, limit: i32) -> Result<(), StreamError> {
        let attempts = self.wait.attempts();

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.wait.delay).await;
            }

            let described = self
                .session
                .client
                .describe_stream()
                .stream_name(name)
                .limit(limit)
                .send()
                .await;
            let Some(out) = surface(described)? else {
                // suppressed already-exists while waiting
                return Ok(());
            };

            match out.stream_description().map(|d| d.stream_status()) {
                Some(StreamStatus::Active) => return Ok(()),
                _status => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(stream = name, attempt, status = ?_status, "stream not active yet");
                }
            }
        }

        Err(StreamError::WaitExhausted {
            stream: name.to_string(),
            attempts,
        })
    }

    /// Append one record. No batching, no retry.
    ///
    /// `partition_key` chooses the shard; it must be non-empty.
    pub async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        payload: &[u8],
    ) -> Result<(), StreamError> {
        validate_stream_name(stream_name)?;
        if partition_key.is_empty() {
            return Err(StreamError::InvalidInput("partition key must not be empty"));
        }

        let put = self
            .session
            .client
            .put_record()
            .stream_name(stream_name)
            .partition_key(partition_key)
            .data(Blob::new(payload))
            .send()
            .await;

        if let Some(_out) = surface(put)? {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                stream = stream_name,
                shard_id = _out.shard_id(),
                sequence_number = _out.sequence_number(),
                "record appended"
            );
        }
        Ok(())
    }

    /// Fetch the next batch from the start of the stream's first shard.
    ///
    /// Each call lists shards, takes a fresh trim-horizon iterator and does a
    /// single fetch of at most one record. Calling it twice returns the same
    /// earliest record again. The service may return more records than asked
    /// for, so callers must not assume exactly one.
    pub async fn consume_records(&self, stream_name: &str) -> Result<Vec<Record>, StreamError> {
        validate_stream_name(stream_name)?;

        let Some(iterator) = self.shard_iterator(stream_name).await? else {
            return Ok(Vec::new());
        };

        let fetched = self
            .session
            .client
            .get_records()
            .shard_iterator(iterator)
            .limit(GET_RECORDS_LIMIT)
            .send()
            .await;
        let records: Vec<Record> = surface(fetched)?
            .map(|out| out.records().iter().map(Record::from).collect())
            .unwrap_or_default();

        #[cfg(feature = "tracing")]
        tracing::debug!(stream = stream_name, count = records.len(), "records fetched");

        Ok(records)
    }

    /// List the stream's shards in service order.
    pub async fn list_shards(&self, stream_name: &str) -> Result<Vec<Shard>, StreamError> {
        validate_stream_name(stream_name)?;

        let listed = self
            .session
            .client
            .list_shards()
            .stream_name(stream_name)
            .send()
            .await;
        Ok(surface(listed)?
            .map(|out| out.shards().iter().map(Shard::from).collect())
            .unwrap_or_default())
    }

    /// Fresh trim-horizon iterator token for the first listed shard.
    ///
    /// `None` when a call's error was suppressed by classification.
    async fn shard_iterator(&self, stream_name: &str) -> Result<Option<String>, StreamError> {
        let shards = self.list_shards(stream_name).await?;

        if shards.len() > 1 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                stream = stream_name,
                shards = shards.len(),
                "stream has more than one shard; reading only the first"
            );
        }

        let shard = shards.first().ok_or_else(|| StreamError::NoShards {
            stream: stream_name.to_string(),
        })?;

        let acquired = self
            .session
            .client
            .get_shard_iterator()
            .stream_name(stream_name)
            .shard_id(&shard.shard_id)
            .shard_iterator_type(ShardIteratorType::TrimHorizon)
            .send()
            .await;

        match surface(acquired)? {
            Some(out) => out
                .shard_iterator()
                .map(|token| Some(token.to_string()))
                .ok_or_else(|| StreamError::Decode("service returned no shard iterator".into())),
            None => Ok(None),
        }
    }
}

/// Run a call result through [`classify`].
///
/// `Ok(None)` means the call failed with a suppressed error.
fn surface<T, E>(result: Result<T, E>) -> Result<Option<T>, StreamError>
where
    E: Into<CallError>,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => match classify(err.into()) {
            Some(err) => Err(err),
            None => Ok(None),
        },
    }
}

fn validate_stream_name(name: &str) -> Result<(), StreamError> {
    if name.is_empty() {
        return Err(StreamError::InvalidInput("stream name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::{ProviderError, ProviderErrorKind};
    use tokio_test::{assert_err, assert_ok};

    async fn client() -> StreamClient {
        let session = Session::builder()
            .endpoint("http://127.0.0.1:9")
            .region("eu-west-1")
            .credentials(Credentials::new("x", "y"))
            .build()
            .await
            .unwrap();
        StreamClient::new(session)
    }

    #[test]
    fn test_surface_suppresses_already_exists() {
        let result: Result<(), CallError> = Err(CallError::Provider(ProviderError::new(
            ProviderErrorKind::ResourceInUse,
            "exists",
            400,
        )));
        assert!(assert_ok!(surface(result)).is_none());
    }

    #[test]
    fn test_surface_wraps_other_errors() {
        let result: Result<(), CallError> = Err(CallError::Provider(ProviderError::new(
            ProviderErrorKind::LimitExceeded,
            "too many",
            400,
        )));
        let err = assert_err!(surface(result));
        assert!(err.is_provider_kind(&ProviderErrorKind::LimitExceeded));
    }

    #[test]
    fn test_surface_passes_values() {
        assert_eq!(assert_ok!(surface::<u8, CallError>(Ok(7))), Some(7));
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_locally() {
        let client = client().await;

        let err = assert_err!(client.put_record("", "key", b"data").await);
        assert!(matches!(err, StreamError::InvalidInput(_)));

        let err = assert_err!(client.put_record("s", "", b"data").await);
        assert!(matches!(err, StreamError::InvalidInput(_)));

        let err = assert_err!(client.consume_records("").await);
        assert!(matches!(err, StreamError::InvalidInput(_)));

        let err = assert_err!(client.create_stream_if_not_exists_named("", 1).await);
        assert!(matches!(err, StreamError::InvalidInput(_)));

        let err = assert_err!(client.create_stream_if_not_exists_named("s", 0).await);
        assert!(matches!(err, StreamError::InvalidInput(_)));

        let err = assert_err!(
            client
                .create_stream_if_not_exists_named("s", u32::MAX)
                .await
        );
        assert!(matches!(err, StreamError::InvalidInput(_)));
    }
}
