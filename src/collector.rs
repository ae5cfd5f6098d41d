use std::sync::Arc;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Request, Uri};
use http_body_util::{BodyExt, Full};
use serde_json::Value;
use thiserror::Error;

use crate::barrier::{CompletionBarrier, Registration};
use crate::flatten::{FlattenError, flatten};
use crate::heartbeat::Heartbeat;
use crate::http::{HttpClient, HttpError};
use crate::metric::Metric;
use crate::sinks::MetricSink;
use crate::stat::Stat;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("response body is empty")]
    EmptyBody,

    #[error("decode json response failed, {0}")]
    Json(#[from] serde_json::Error),

    #[error("flatten response failed, {0}")]
    Flatten(#[from] FlattenError),
}

/// One fetch, parse, flatten and emit round against a single endpoint.
///
/// The task is counted by the barrier from the moment it is created. Running
/// it always ends with one batch handed to the sink and the registration
/// given back, whatever happened before. Errors never leave the task, they
/// are logged and the batch is empty.
pub struct CollectorTask {
    stat: Arc<Stat>,
    client: HttpClient,
    sink: Arc<dyn MetricSink>,
    prefix: String,
    url: Uri,
    heartbeat: Heartbeat,
    registration: Registration,
}

impl CollectorTask {
    /// `prefix` is prepended verbatim to every metric path.
    pub fn new(
        stat: Arc<Stat>,
        client: HttpClient,
        sink: Arc<dyn MetricSink>,
        prefix: impl Into<String>,
        url: Uri,
        heartbeat: Heartbeat,
        barrier: &CompletionBarrier,
    ) -> Self {
        Self {
            registration: barrier.register(),
            stat,
            client,
            sink,
            prefix: prefix.into(),
            url,
            heartbeat,
        }
    }

    pub async fn run(self) {
        let CollectorTask {
            stat,
            client,
            sink,
            prefix,
            url,
            heartbeat,
            registration,
        } = self;

        let metrics = match collect(&client, &url, &stat, &prefix, &heartbeat).await {
            Ok(metrics) => {
                debug!(
                    message = "Successfully collected metrics",
                    %url,
                    stat = stat.name(),
                    count = metrics.len(),
                );

                metrics
            }
            Err(err) => {
                warn!(
                    message = "Collect metrics failed",
                    %url,
                    stat = stat.name(),
                    %err,
                );

                vec![]
            }
        };

        sink.write(metrics).await;
        registration.arrive_and_deregister();
    }
}

async fn collect(
    client: &HttpClient,
    url: &Uri,
    stat: &Stat,
    prefix: &str,
    heartbeat: &Heartbeat,
) -> Result<Vec<Metric>, Error> {
    let req = Request::get(url.clone())
        .header(ACCEPT, "application/json")
        .body(Full::<Bytes>::default())
        .map_err(HttpError::BuildRequest)?;

    let resp = client.send(req).await?;
    let (parts, incoming) = resp.into_parts();
    // the connection goes back to the pool once the body is drained, and is
    // closed if reading fails
    let body = incoming
        .collect()
        .await
        .map_err(HttpError::ReadIncoming)?
        .to_bytes();

    if body.is_empty() {
        return Err(Error::EmptyBody);
    }

    if heartbeat.beat() {
        info!(message = "Endpoint is reachable", %url);
    }

    if !is_json(&parts.headers) {
        debug!(
            message = "Response is not JSON, skip it",
            %url,
            status = %parts.status,
            content_type = ?parts.headers.get(CONTENT_TYPE),
        );

        return Ok(vec![]);
    }

    // invalid sequences become U+FFFD
    let body = String::from_utf8_lossy(&body);
    let payload = serde_json::from_str::<Value>(&body)?;

    flatten(&payload, prefix, stat.metrics()).map_err(Into::into)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}
