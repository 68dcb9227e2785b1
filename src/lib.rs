//! Tonify backend - account and matching service for the Tonify freelance marketplace
//!
//! Accounts (clients and freelancers) are created with attached media, browse a
//! candidate feed of the opposite role, and like or dislike candidates. Mutual
//! likes resolve into a match. Clients publish a capped number of tasks.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    AccountCoordinator, AttachmentManager, MatchEngine, ServiceError, TaskService,
};
pub use crate::models::{Account, AccountDetails, MatchAction, MatchResult, Role};
pub use crate::services::{FileStorage, PostgresStore, TransactionProvider};
