//! Observability for the token rotator.
//!
//! Logging goes through `tracing` with literal `target:` values per component
//! (`rotator.store`, `rotator.task.scheduler`, `rotator.health`, ...).
//! Token values never appear in log fields; only lengths, claim timestamps
//! and the `jti` are logged.

pub mod metrics;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
///
/// `rotator` covers the literal `rotator.*` event targets; `token_rotator`
/// covers spans and events that default to the module path.
pub const DEFAULT_LOG_FILTER: &str = "token_rotator=debug,rotator=debug,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `LOG_FORMAT=json` switches to one JSON object per line; anything else
/// keeps the human-readable format.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
