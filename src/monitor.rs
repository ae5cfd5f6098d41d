use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Uri;
use tokio::time::MissedTickBehavior;

use crate::METRIC_SEPARATOR;
use crate::barrier::CompletionBarrier;
use crate::collector::CollectorTask;
use crate::config::Config;
use crate::heartbeat::Heartbeat;
use crate::http::HttpClient;
use crate::metric::Metric;
use crate::sinks::MetricSink;
use crate::stat::{MetricConfig, Properties, Stat};

const HEARTBEAT: &str = "HeartBeat";

struct Server {
    name: String,
    url: Uri,
    prefix: String,
    client: HttpClient,
    heartbeat: Heartbeat,
}

/// Polls every configured server for every stat, once per interval.
pub struct Monitor {
    interval: Duration,
    servers: Vec<Server>,
    stats: Vec<Arc<Stat>>,
    sink: Arc<dyn MetricSink>,
    barrier: CompletionBarrier,
    heartbeat_properties: Arc<Properties>,
}

impl Monitor {
    /// `client` is shared by all servers, each gets its own credentials on
    /// top of it.
    pub fn new(config: &Config, client: HttpClient, sink: Arc<dyn MetricSink>) -> Self {
        let servers = config
            .servers
            .iter()
            .map(|server| Server {
                name: server.name.clone(),
                url: server.url.clone(),
                prefix: path_prefix(&config.metric_prefix, &server.name),
                client: client.with_auth(server.auth.clone()),
                heartbeat: Heartbeat::new(),
            })
            .collect();

        Monitor {
            interval: config.interval,
            servers,
            stats: config.stats.iter().cloned().map(Arc::new).collect(),
            sink,
            barrier: CompletionBarrier::new(),
            heartbeat_properties: Arc::new(MetricConfig::new(HEARTBEAT, HEARTBEAT).properties()),
        }
    }

    pub fn heartbeat(&self, name: &str) -> Option<&Heartbeat> {
        self.servers
            .iter()
            .find(|server| server.name == name)
            .map(|server| &server.heartbeat)
    }

    /// Collect every stat from every server concurrently and wait for all
    /// of them, then report the heartbeat of each server.
    pub async fn run_cycle(&self) {
        let start = Instant::now();

        for server in &self.servers {
            for stat in &self.stats {
                let task = CollectorTask::new(
                    Arc::clone(stat),
                    server.client.clone(),
                    Arc::clone(&self.sink),
                    server.prefix.clone(),
                    server.url.clone(),
                    server.heartbeat.clone(),
                    &self.barrier,
                );

                tokio::spawn(task.run());
            }
        }

        self.barrier.wait().await;

        for server in &self.servers {
            let metric = Metric::new(
                HEARTBEAT,
                server.heartbeat.get().to_string(),
                format!("{}{HEARTBEAT}", server.prefix),
                Arc::clone(&self.heartbeat_properties),
            );

            self.sink.write(vec![metric]).await;
        }

        debug!(
            message = "Collect cycle finished",
            servers = self.servers.len(),
            stats = self.stats.len(),
            elapsed = ?start.elapsed(),
        );
    }

    /// Run a cycle every interval until `shutdown` resolves. The first cycle
    /// starts immediately, and a running cycle is never interrupted.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = pin!(shutdown);

        info!(
            message = "Start collecting",
            interval = ?self.interval,
            servers = self.servers.len(),
            stats = self.stats.len(),
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            self.run_cycle().await;
        }

        info!(message = "Collecting stopped");
    }
}

/// `{metric_prefix}|{name}|`, without doubled or leading separators.
fn path_prefix(metric_prefix: &str, name: &str) -> String {
    let metric_prefix = metric_prefix.trim_end_matches(METRIC_SEPARATOR);

    if metric_prefix.is_empty() {
        format!("{name}{METRIC_SEPARATOR}")
    } else {
        format!("{metric_prefix}{METRIC_SEPARATOR}{name}{METRIC_SEPARATOR}")
    }
}
