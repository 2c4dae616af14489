pub mod builders;
pub mod events;
pub mod fake_executor;
pub mod session;

pub use builders::{GraphBuilder, NodeBuilder};
pub use events::EventLog;
pub use fake_executor::{Call, Gate, NodeScript, ScriptedExecutor};
pub use session::{SessionClient, channel_session};

use std::sync::Once;
use std::time::Duration;

use nodeflow::engine::EngineOptions;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=nodeflow=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Engine options with a short poll interval so tests run quickly.
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        poll_interval: Duration::from_millis(10),
        shutdown_grace: Duration::from_millis(500),
        ..EngineOptions::default()
    }
}
