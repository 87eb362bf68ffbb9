use std::io::IsTerminal;
use tracing_subscriber::{fmt, EnvFilter};

/// Log to stdout. `RUST_LOG` wins over the default level (`info`, or
/// `debug` with `--verbose`).
///
/// Stdout rather than stderr so the upload page can show the run log of its
/// child process; colors only when attached to a terminal.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}
