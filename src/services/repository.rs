use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::domain::{
    Account, Attachment, CandidateQuery, Category, Company, DislikeAccount, LikeAccount,
    NewAccount, NewAttachment, NewCompany, NewTask, Role, Tag, Task,
};

/// Errors raised by a relational store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("SQLx error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation(db.message().to_string())
            }
            other => StoreError::Sqlx(other),
        }
    }
}

impl From<crate::models::domain::ParseEnumError> for StoreError {
    fn from(err: crate::models::domain::ParseEnumError) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Account rows. Soft-deleted accounts are invisible to every read.
#[async_trait]
pub trait AccountRepository: Send {
    async fn exists_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError>;

    /// True when the telegram id belongs to a soft-deleted account
    async fn is_deleted_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError>;

    async fn create(&mut self, account: &NewAccount) -> Result<i64, StoreError>;

    /// Load an active account with its company and attachments resolved
    async fn get_by_id(&mut self, id: i64) -> Result<Account, StoreError>;

    /// Persist the scalar fields and the company/attachment references
    async fn update(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn update_role(&mut self, id: i64, role: Role) -> Result<(), StoreError>;

    async fn soft_delete(&mut self, id: i64) -> Result<(), StoreError>;

    /// Opposite-role accounts with no like/dislike edge authored by the requester
    async fn matchable(&mut self, query: &CandidateQuery) -> Result<Vec<Account>, StoreError>;

    async fn count_matchable(&mut self, query: &CandidateQuery) -> Result<i64, StoreError>;

    /// Accounts holding a like edge that points at `account_id`
    async fn likers(
        &mut self,
        account_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError>;

    async fn count_likers(&mut self, account_id: i64) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait CompanyRepository: Send {
    async fn create(&mut self, company: &NewCompany) -> Result<i64, StoreError>;
    async fn get_by_id(&mut self, id: i64) -> Result<Company, StoreError>;
    async fn update(&mut self, company: &Company) -> Result<(), StoreError>;
    async fn delete(&mut self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AttachmentRepository: Send {
    async fn create(&mut self, attachment: &NewAttachment) -> Result<i64, StoreError>;
    async fn get_by_id(&mut self, id: i64) -> Result<Attachment, StoreError>;

    /// Point an existing row at a freshly uploaded blob
    async fn update(&mut self, id: i64, attachment: &NewAttachment) -> Result<(), StoreError>;

    async fn delete(&mut self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TagRepository: Send {
    /// Create the tag if absent, then link it to the account
    async fn attach(&mut self, account_id: i64, title: &str) -> Result<(), StoreError>;
    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Tag>, StoreError>;
    async fn detach_all(&mut self, account_id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CategoryRepository: Send {
    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Category>, StoreError>;
    async fn add_to_account(&mut self, account_id: i64, category_id: i64)
        -> Result<(), StoreError>;
    async fn delete_from_account(&mut self, account_id: i64) -> Result<(), StoreError>;
}

/// Like, dislike and seen edges between accounts
#[async_trait]
pub trait RelationshipRepository: Send {
    async fn exists_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError>;
    async fn like(&mut self, edge: LikeAccount) -> Result<(), StoreError>;
    async fn delete_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError>;

    async fn exists_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError>;
    async fn dislike(&mut self, edge: DislikeAccount) -> Result<(), StoreError>;
    async fn delete_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError>;

    /// Remove dislikes authored by `disliker_id` created before `before`
    async fn delete_expired_dislikes(
        &mut self,
        disliker_id: i64,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Insert the pair with rating 0 or bump its rating on repeat exposure
    async fn mark_seen(&mut self, viewer_id: i64, viewed_id: i64) -> Result<(), StoreError>;
}

/// Task rows. Tasks of soft-deleted owners are invisible to every read.
#[async_trait]
pub trait TaskRepository: Send {
    /// Serialize task creation per owner until the surrounding transaction ends
    async fn lock_owner(&mut self, owner_id: i64) -> Result<(), StoreError>;

    async fn create(&mut self, task: &NewTask) -> Result<i64, StoreError>;
    async fn get_by_id(&mut self, id: i64) -> Result<Task, StoreError>;
    async fn count_by_owner(&mut self, owner_id: i64) -> Result<i64, StoreError>;

    async fn list_by_owner(
        &mut self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError>;
}

/// Bundle of repositories bound to one connection or transaction
pub trait Repositories: Send {
    fn accounts(&mut self) -> &mut dyn AccountRepository;
    fn companies(&mut self) -> &mut dyn CompanyRepository;
    fn attachments(&mut self) -> &mut dyn AttachmentRepository;
    fn tags(&mut self) -> &mut dyn TagRepository;
    fn categories(&mut self) -> &mut dyn CategoryRepository;
    fn relations(&mut self) -> &mut dyn RelationshipRepository;
    fn tasks(&mut self) -> &mut dyn TaskRepository;
}

/// Repositories bound to one open transaction.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] rolls it back.
#[async_trait]
pub trait UnitOfWork: Repositories {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Hands out repository bundles, transactional or autocommit
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
    async fn session(&self) -> Result<Box<dyn Repositories>, StoreError>;
}
