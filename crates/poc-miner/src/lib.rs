//! # Miner Library
//!
//! Exposes the binary's configuration loader for testing; the entry point
//! itself lives in `main.rs`.

pub mod config;
