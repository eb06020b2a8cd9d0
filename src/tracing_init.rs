//! Tracing initialization for tests and binaries.
//!
//! Centralises `tracing` setup with environment-based filtering, per
//! spec.md §5's ambient logging requirement.

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initializes tracing for tests, gated by `RUST_LOG`.
///
/// - `RUST_LOG=ran5g_fec=debug` - all debug output.
/// - `RUST_LOG=ran5g_fec::ldpc::decoder=trace` - a single module.
///
/// Safe to call from every test; only the first call takes effect.
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ran5g_fec=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initializes tracing for binaries/bench harnesses built against this crate.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ran5g_fec=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}
