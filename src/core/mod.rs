// Core service exports
pub mod account;
pub mod attachment;
pub mod error;
pub mod matcher;
pub mod task;

pub use account::{normalize_tags, AccountCoordinator};
pub use attachment::AttachmentManager;
pub use error::ServiceError;
pub use matcher::MatchEngine;
pub use task::TaskService;
