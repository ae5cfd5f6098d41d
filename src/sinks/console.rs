use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::MetricSink;
use crate::metric::Metric;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// `path=value`
    #[default]
    Text,
    /// One JSON object per metric, properties included.
    Json,
}

impl Encoding {
    fn encode(&self, metric: &Metric, buf: &mut Vec<u8>) {
        match self {
            Encoding::Text => {
                buf.extend_from_slice(metric.path.as_bytes());
                buf.push(b'=');
                buf.extend_from_slice(metric.value.as_bytes());
            }
            Encoding::Json => {
                if let Err(err) = serde_json::to_writer(&mut *buf, metric) {
                    warn!(message = "Encode metric failed", path = %metric.path, %err);
                    return;
                }
            }
        }

        buf.push(b'\n');
    }
}

/// Writes metrics to the standard output or error, one line per metric.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The standard stream to write to.
    #[serde(default)]
    pub stream: Stream,

    #[serde(default)]
    pub encoding: Encoding,
}

impl Config {
    pub fn build(&self) -> Arc<dyn MetricSink> {
        match self.stream {
            Stream::Stdout => Arc::new(WriteSink::new(tokio::io::stdout(), self.encoding)),
            Stream::Stderr => Arc::new(WriteSink::new(tokio::io::stderr(), self.encoding)),
        }
    }
}

/// Batches from concurrent tasks are written whole, never interleaved.
pub struct WriteSink<T> {
    writer: Mutex<T>,
    encoding: Encoding,
}

impl<T> WriteSink<T> {
    pub fn new(writer: T, encoding: Encoding) -> Self {
        Self {
            writer: Mutex::new(writer),
            encoding,
        }
    }

    pub fn into_inner(self) -> T {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<T> MetricSink for WriteSink<T>
where
    T: AsyncWrite + Send + Unpin,
{
    async fn write(&self, metrics: Vec<Metric>) {
        if metrics.is_empty() {
            return;
        }

        let mut buf = Vec::with_capacity(metrics.len() * 64);
        for metric in &metrics {
            self.encoding.encode(metric, &mut buf);
        }

        let mut writer = self.writer.lock().await;
        let result = match writer.write_all(&buf).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            error!(
                message = "Write metrics to output failed",
                count = metrics.len(),
                %err
            );
        }
    }
}
