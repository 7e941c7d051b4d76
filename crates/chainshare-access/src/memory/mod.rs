//! In-memory implementations for testing

mod mirror;

pub use mirror::InMemoryMirror;
