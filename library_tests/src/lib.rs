//! End-to-end tests against a running library_service.
//!
//! Start the service (for example with `USE_IN_MEMORY_DB=true`) and run
//! `cargo test -p library_tests --features system_tests`.

#[cfg(all(test, feature = "system_tests"))]
mod system_tests;
