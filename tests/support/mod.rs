// ABOUTME: Test support utilities.
// ABOUTME: Provides the scripted fake gateway and fast reconcile settings.

use std::sync::Once;
use std::time::Duration;
use vs::machine::ReconcileSettings;
use vs::provider::RetryPolicy;
use vs::types::MachineName;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_gateway;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("vs=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Millisecond polling with a generous deadline; tests bound waits with `max_polls`.
#[allow(dead_code)]
pub fn fast_settings(max_polls: u32) -> ReconcileSettings {
    ReconcileSettings {
        poll_interval: Duration::from_millis(1),
        timeout: Duration::from_secs(30),
        max_polls,
    }
}

#[allow(dead_code)]
pub fn fast_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    }
}

#[allow(dead_code)]
pub fn name(value: &str) -> MachineName {
    MachineName::new(value).unwrap()
}
