use std::io::IsTerminal;

pub fn trace_init() {
    let color = std::io::stderr().is_terminal();
    let levels = std::env::var("TEST_LOG").unwrap_or_else(|_| "warn".into());

    crate::trace::init(color, false, &levels)
}
