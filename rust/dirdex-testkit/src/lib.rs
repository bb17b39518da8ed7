//! Test utilities for the dirdex crates.
//!
//! - Seeded data generation (entry ids, attribute values, workloads)
//! - Sample directory entries and scratch working directories

pub mod data_gen;
pub mod dirs;
