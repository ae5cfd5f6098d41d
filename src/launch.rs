use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use argh::FromArgs;
use exitcode::ExitCode;
use tracing::{error, info, warn};
use vts_collector::config::{Config, ConfigError};
use vts_collector::http::HttpClient;
use vts_collector::monitor::Monitor;

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[derive(FromArgs)]
#[argh(
    description = "Collect nginx virtual host traffic status as metrics",
    help_triggers("-h", "--help")
)]
pub struct RootCommand {
    #[argh(switch, short = 'v', description = "show version")]
    version: bool,

    #[argh(
        option,
        short = 'l',
        default = "\"info\".to_string()",
        description = "log level"
    )]
    log_level: String,

    #[argh(switch, description = "write logs as JSON lines")]
    log_json: bool,

    #[argh(option, short = 'c', description = "path of the configuration file")]
    config: Option<PathBuf>,

    #[argh(
        option,
        short = 't',
        default = "default_worker_threads()",
        description = "specify how many threads the Tokio runtime will use"
    )]
    threads: usize,

    #[argh(switch, description = "collect once and exit")]
    once: bool,
}

impl RootCommand {
    #![allow(clippy::print_stdout, clippy::print_stderr)]
    fn show_version(&self) {
        println!("vts-collector {}", vts_collector::get_version());
    }

    pub fn run(&self) -> Result<(), ExitCode> {
        if self.version {
            self.show_version();
            return Ok(());
        }

        let Some(path) = self.config.clone() else {
            eprintln!("Required options not provided:\n    --config");
            return Err(exitcode::USAGE);
        };

        let levels = std::env::var("VTS_LOG").unwrap_or_else(|_| self.log_level.clone());
        let color = std::io::stderr().is_terminal();
        vts_collector::trace::init(color && !self.log_json, self.log_json, &levels);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("vts-worker")
            .worker_threads(self.threads.max(1))
            .enable_io()
            .enable_time()
            .build()
            .map_err(|err| {
                error!(message = "Build tokio runtime failed", %err);
                exitcode::SOFTWARE
            })?;

        let once = self.once;
        let threads = self.threads;
        runtime.block_on(async move {
            let config = Config::load(&path).map_err(handle_config_error)?;

            info!(
                message = "Start vts-collector",
                version = vts_collector::get_version(),
                threads,
                config = ?path,
            );

            let client = HttpClient::new(config.timeout).map_err(|err| {
                error!(message = "Build http client failed", %err);
                exitcode::SOFTWARE
            })?;
            let sink = config.sink.build();
            let monitor = Monitor::new(&config, client, sink);

            if once {
                monitor.run_cycle().await;
            } else {
                monitor.run(shutdown_signal()).await;
            }

            Ok::<(), ExitCode>(())
        })?;

        runtime.shutdown_timeout(Duration::from_secs(5));

        Ok(())
    }
}

fn handle_config_error(err: ConfigError) -> ExitCode {
    match err {
        ConfigError::Invalid(errs) => {
            for err in errs {
                error!(message = "Configuration error", %err);
            }
        }
        err => error!(message = "Load configuration failed", %err),
    }

    exitcode::CONFIG
}

/// Resolves on the first ctrl-c or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                warn!(message = "Listen for SIGTERM failed", %err);
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;

    info!(message = "Shutdown signal received");
}

async fn ctrl_c() {
    settle(tokio::signal::ctrl_c().await).await
}

/// A signal listener that could not be installed never fires.
async fn settle(result: std::io::Result<()>) {
    if let Err(err) = result {
        error!(message = "Listen for ctrl-c failed", %err);
        std::future::pending::<()>().await;
    }
}
