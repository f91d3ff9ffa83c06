//! Test doubles for downstream crates. Enabled with the `test-helpers` feature.

pub mod memory;

pub use memory::InMemoryStore;
