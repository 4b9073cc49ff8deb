use thiserror::Error;

use vllmscope_types::{LogRecord, MetricsMessage};

/// A frame that could not be turned into a message
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid frame: {0}")]
    Invalid(String),
}

/// Decodes the text frames of one stream endpoint into typed messages
///
/// Each stream instance is parameterized by exactly one codec, so metrics
/// and log frames never share a buffer.
pub trait StreamCodec: Send + 'static {
    type Item: Clone + Send + 'static;

    /// Path of the endpoint, appended to the websocket base URL
    const ENDPOINT: &'static str;

    /// Short name used in log output
    const NAME: &'static str;

    fn decode(frame: &str) -> Result<Self::Item, DecodeError>;
}

/// Codec for `/api/metrics/stream`
pub struct MetricsCodec;

impl StreamCodec for MetricsCodec {
    type Item = MetricsMessage;

    const ENDPOINT: &'static str = "/api/metrics/stream";
    const NAME: &'static str = "metrics";

    fn decode(frame: &str) -> Result<MetricsMessage, DecodeError> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Codec for `/api/logs/stream`
pub struct LogCodec;

impl StreamCodec for LogCodec {
    type Item = LogRecord;

    const ENDPOINT: &'static str = "/api/logs/stream";
    const NAME: &'static str = "logs";

    fn decode(frame: &str) -> Result<LogRecord, DecodeError> {
        let record: LogRecord = serde_json::from_str(frame)?;
        if record.timestamp.is_empty() && record.message.is_empty() {
            return Err(DecodeError::Invalid("empty log record".to_string()));
        }
        Ok(record)
    }
}

/// Build the full endpoint URL from a websocket base
pub fn endpoint_url<C: StreamCodec>(ws_base: &str) -> String {
    format!("{}{}", ws_base.trim_end_matches('/'), C::ENDPOINT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vllmscope_types::Severity;

    #[test]
    fn test_decode_metrics_frame() {
        let frame = r#"{"timestamp":"2024-05-01T10:00:00Z","metrics":{"queue_size":3},"derived":{"cache_hit_rate":12.5}}"#;
        let msg = MetricsCodec::decode(frame).unwrap();
        assert_eq!(msg.metrics.unwrap().queue_size, 3);
        assert_eq!(msg.derived.unwrap().cache_hit_rate, Some(12.5));
    }

    #[test]
    fn test_decode_log_frame() {
        let frame = r#"{"timestamp":"2024-05-01 10:00:00","level":"ERROR","message":"boom","raw_line":"... boom"}"#;
        let record = LogCodec::decode(frame).unwrap();
        assert_eq!(record.level, Severity::Error);
        assert_eq!(record.message, "boom");
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(matches!(MetricsCodec::decode("not json"), Err(DecodeError::Json(_))));
        assert!(LogCodec::decode("{\"level\":").is_err());
        assert!(matches!(
            LogCodec::decode(r#"{"timestamp":"","level":"INFO","message":""}"#),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url::<MetricsCodec>("ws://localhost:8080/"),
            "ws://localhost:8080/api/metrics/stream"
        );
        assert_eq!(
            endpoint_url::<LogCodec>("ws://10.0.0.5:8080"),
            "ws://10.0.0.5:8080/api/logs/stream"
        );
    }
}
