//! Tracing/logging setup shared by binaries and tests.

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize logging for tests (captured by the test harness).
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Subscriber construction (filters, output format).
pub mod tracing;
