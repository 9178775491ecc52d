//! End-to-end suites against real containers and a live tenant.
//!
//! Run with `tedge-it test` or
//! `cargo test --manifest-path tests/Cargo.toml --features e2e`.

mod suites;
