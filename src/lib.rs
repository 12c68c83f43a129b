//! Lume Social - discovery, likes and messaging data access for Lume dating app
//!
//! This library provides the query and pagination engine behind user
//! discovery, directional likes and two-party message threads, along with
//! the PostgreSQL and in-memory stores it runs against.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{DatingError, DatingService, MessageScope, PageRequest, PagedList, UserQuery};
pub use crate::models::{Like, Message, MessageContainer, MessageParameters, User, UserParameters};
pub use crate::services::{ChangeSet, DatingRepository, InMemoryStore, PostgresClient};
