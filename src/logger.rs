use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `SPECSTRESS_LOG`, then `RUST_LOG`, take
/// precedence over the verbosity flag. Logs go to stderr.
///
/// Returns `false` when a subscriber was already installed; that call
/// changes nothing.
pub fn init_logging(verbose: bool, no_color: bool) -> bool {
    let filter = std::env::var("SPECSTRESS_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| default_filter(verbose),
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| default_filter(verbose)),
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => true,
        Err(err) => {
            debug!("Keeping the installed subscriber: {}", err);
            false
        }
    }
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() -> Result<(), String> {
        init_logging(false, true);
        if init_logging(true, true) {
            return Err("Second call replaced the installed subscriber".to_owned());
        }
        if init_logging(false, false) {
            return Err("Third call replaced the installed subscriber".to_owned());
        }
        Ok(())
    }
}
