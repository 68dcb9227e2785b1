use std::sync::Arc;
use validator::Validate;

use crate::core::error::{not_found_as, ServiceError};
use crate::models::domain::{NewTask, Page, Role, Task};
use crate::models::requests::CreateTask;
use crate::services::repository::TransactionProvider;

/// Task board for client accounts
///
/// Only clients publish tasks, and each owner holds at most `max_per_account`
/// of them. The owner row is locked while counting so concurrent creates
/// cannot both slip under the cap.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TransactionProvider>,
    max_per_account: i64,
}

impl TaskService {
    pub fn new(store: Arc<dyn TransactionProvider>, max_per_account: i64) -> Self {
        Self {
            store,
            max_per_account,
        }
    }

    pub async fn create_task(&self, owner_id: i64, cmd: CreateTask) -> Result<Task, ServiceError> {
        cmd.validate()?;

        let mut uow = self.store.begin().await?;

        let owner = uow
            .accounts()
            .get_by_id(owner_id)
            .await
            .map_err(not_found_as("account"))?;
        if owner.role != Role::Client {
            tracing::warn!("Account {} with role {} tried to create a task", owner_id, owner.role);
            return Err(ServiceError::Forbidden(format!(
                "only {} accounts can create tasks",
                Role::Client
            )));
        }

        uow.tasks()
            .lock_owner(owner_id)
            .await
            .map_err(not_found_as("account"))?;

        let created = uow.tasks().count_by_owner(owner_id).await?;
        if created >= self.max_per_account {
            tracing::error!(
                "Account {} has reached the task limit ({}/{})",
                owner_id,
                created,
                self.max_per_account
            );
            return Err(ServiceError::TaskLimit(self.max_per_account));
        }

        let task = NewTask {
            owner_id,
            title: cmd.title,
            description: cmd.description,
        };
        let id = uow.tasks().create(&task).await?;
        let task = uow.tasks().get_by_id(id).await.map_err(not_found_as("task"))?;

        uow.commit().await?;

        tracing::info!("Created task {} for account {}", id, owner_id);
        Ok(task)
    }

    /// Page of one owner's tasks, newest first
    pub async fn owner_tasks(
        &self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Page<Task>, ServiceError> {
        let mut session = self.store.session().await?;

        let data = session.tasks().list_by_owner(owner_id, offset, limit).await?;
        let total = session.tasks().count_by_owner(owner_id).await?;

        Ok(Page {
            offset,
            limit,
            total,
            data,
        })
    }
}
