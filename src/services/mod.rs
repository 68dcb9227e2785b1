// Service exports
pub mod postgres;
pub mod repository;
pub mod storage;

pub use postgres::{PgRepositories, PostgresStore};
pub use repository::{
    AccountRepository, AttachmentRepository, CategoryRepository, CompanyRepository,
    RelationshipRepository, Repositories, StoreError, TagRepository, TaskRepository,
    TransactionProvider, UnitOfWork,
};
pub use storage::{FileStorage, S3Storage, StorageError};
