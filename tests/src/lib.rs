//! # PoC Miner Integration Tests
//!
//! Exercises `round-engine` end-to-end through test-double adapters,
//! the way a real binary wires `HttpPoolClient`/`FilesystemPlotReader`
//! but deterministic and filesystem-free.
//!
//! ```bash
//! cargo test -p poc-miner-tests
//! ```

#![allow(dead_code)]

pub mod integration;
