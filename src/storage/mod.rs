//! Storage layer: the principal store interface.
//!
//! Durable persistence is an external collaborator; this crate only defines
//! the narrow repository trait the auth stack depends on, plus an in-memory
//! implementation used for local runs and tests.

pub mod repository;

pub use repository::{InMemoryUserRepository, UserRepository};
