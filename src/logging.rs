//! Tracing subscriber setup for the `arbx` binary.
//!
//! Log output goes to stderr so that `arbx estimate --json` keeps stdout
//! machine-readable. The filter comes from `RUST_LOG` and defaults to
//! `info` for this crate and `warn` for dependencies.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,arbitration_estimator=info,arbx=info";

/// Install the global subscriber. `verbose` lowers the default to `debug`.
///
/// Calling this twice is harmless: the second install is ignored.
pub fn init(verbose: bool) {
    let default = if verbose {
        "warn,arbitration_estimator=debug,arbx=debug"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
