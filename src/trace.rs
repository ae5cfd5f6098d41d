use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Turns a plain level like `debug` into a directive for this crate only,
/// anything containing `=` or `,` is taken as a full filter.
pub fn directives(levels: &str) -> String {
    match levels {
        "off" => "off".to_string(),
        levels if levels.contains('=') || levels.contains(',') => levels.to_string(),
        level => format!("vts_collector={level}"),
    }
}

/// Install the global subscriber, logs go to stderr so metrics written to
/// stdout stay clean. Installing twice is a no-op.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_new(directives(levels)).unwrap_or_else(|err| {
        eprintln!("Invalid log level {levels:?}, fallback to info, {err}");
        EnvFilter::new("vts_collector=info")
    });

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false);

    let _ = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
}
