//! # CBAM Test Suite
//!
//! Unified test crate for the emission engine.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (graph propagation, detection)
//! └── src/
//!     ├── fixtures.rs   # Shared stores, datasets and service wiring
//!     └── integration/  # End-to-end flows through the public API
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cbam-tests
//!
//! # By category
//! cargo test -p cbam-tests integration::propagation_flows
//!
//! # Benchmarks
//! cargo bench -p cbam-tests
//! ```

pub mod fixtures;
pub mod integration;
