use std::sync::Arc;
use validator::Validate;

use crate::core::attachment::AttachmentManager;
use crate::core::error::{not_found_as, ServiceError};
use crate::models::domain::{
    Account, AccountDetails, Attachment, Gender, NewAccount, NewCompany, Role,
};
use crate::models::requests::{CreateAccount, EditAccount, UploadFile};
use crate::services::repository::{TransactionProvider, UnitOfWork};

/// Account mutation coordinator
///
/// Combines relational writes inside one unit of work with blob uploads that
/// cannot take part in it. Blob deletes are compensations issued after the unit
/// of work settled: new blobs on failure, replaced blobs after a successful commit.
#[derive(Clone)]
pub struct AccountCoordinator {
    store: Arc<dyn TransactionProvider>,
    attachments: AttachmentManager,
}

impl AccountCoordinator {
    pub fn new(store: Arc<dyn TransactionProvider>, attachments: AttachmentManager) -> Self {
        Self { store, attachments }
    }

    /// Register a new account and return its id
    pub async fn create_account(&self, cmd: CreateAccount) -> Result<i64, ServiceError> {
        cmd.validate()?;
        let role: Role = cmd.role.parse()?;
        let gender: Gender = cmd.gender.parse()?;

        self.ensure_telegram_id_available(cmd.telegram_id).await?;

        let mut uploaded = Vec::new();
        match self.create_in_transaction(&cmd, role, gender, &mut uploaded).await {
            Ok(id) => {
                tracing::info!("Created account {} (telegram_id={})", id, cmd.telegram_id);
                Ok(id)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to create account for telegram_id {}: {}",
                    cmd.telegram_id,
                    e
                );
                self.attachments.cleanup_all(&uploaded).await;
                Err(e)
            }
        }
    }

    async fn ensure_telegram_id_available(&self, telegram_id: i64) -> Result<(), ServiceError> {
        let mut session = self.store.session().await?;

        if session.accounts().is_deleted_with_telegram_id(telegram_id).await? {
            tracing::error!("Telegram id {} belongs to a deleted account", telegram_id);
            return Err(ServiceError::Duplicate(format!(
                "account for telegram id {telegram_id} was deleted"
            )));
        }

        if session.accounts().exists_with_telegram_id(telegram_id).await? {
            tracing::error!("Telegram id {} is already registered", telegram_id);
            return Err(ServiceError::Duplicate(format!(
                "account for telegram id {telegram_id} already exists"
            )));
        }

        Ok(())
    }

    async fn create_in_transaction(
        &self,
        cmd: &CreateAccount,
        role: Role,
        gender: Gender,
        uploaded: &mut Vec<String>,
    ) -> Result<i64, ServiceError> {
        let mut uow = self.store.begin().await?;

        let company_id = match (&cmd.company_name, &cmd.company_description) {
            (Some(name), Some(description)) => {
                let company = NewCompany {
                    name: name.clone(),
                    description: description.clone(),
                };
                Some(uow.companies().create(&company).await?)
            }
            _ => None,
        };

        let avatar_id = self
            .store_new_attachment(uow.as_mut(), cmd.avatar.as_ref(), uploaded)
            .await?;
        let document_id = self
            .store_new_attachment(uow.as_mut(), cmd.document.as_ref(), uploaded)
            .await?;

        let account = NewAccount {
            telegram_id: cmd.telegram_id,
            first_name: cmd.first_name.clone(),
            middle_name: cmd.middle_name.clone(),
            last_name: cmd.last_name.clone(),
            nickname: cmd.nickname.clone(),
            role,
            about_me: cmd.about_me.clone(),
            gender,
            country: cmd.country.clone(),
            location: cmd.location.clone(),
            company_id,
            avatar_id,
            document_id,
        };
        let id = uow.accounts().create(&account).await?;

        if let Some(tags) = &cmd.tags {
            for tag in normalize_tags(tags) {
                uow.tags().attach(id, &tag).await?;
            }
        }

        if let Some(category_ids) = &cmd.category_ids {
            for category_id in category_ids {
                uow.categories().add_to_account(id, *category_id).await?;
            }
        }

        uow.commit().await?;
        Ok(id)
    }

    async fn store_new_attachment(
        &self,
        uow: &mut dyn UnitOfWork,
        file: Option<&UploadFile>,
        uploaded: &mut Vec<String>,
    ) -> Result<Option<i64>, ServiceError> {
        let Some(file) = file else {
            return Ok(None);
        };

        let attachment = self.attachments.upload_and_prepare(file).await?;
        uploaded.push(attachment.file_name.clone());

        let id = uow.attachments().create(&attachment).await?;
        Ok(Some(id))
    }

    /// Edit an account's profile, company, attachments and links
    pub async fn edit_account(&self, cmd: EditAccount) -> Result<(), ServiceError> {
        cmd.validate()?;
        let role: Role = cmd.role.parse()?;
        let gender: Gender = cmd.gender.parse()?;

        let mut uploaded = Vec::new();
        match self.edit_in_transaction(&cmd, role, gender, &mut uploaded).await {
            Ok(replaced) => {
                tracing::info!("Edited account {}", cmd.id);
                self.attachments.cleanup_all(&replaced).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to edit account {}: {}", cmd.id, e);
                self.attachments.cleanup_all(&uploaded).await;
                Err(e)
            }
        }
    }

    /// Returns the names of blobs replaced by the committed edit
    async fn edit_in_transaction(
        &self,
        cmd: &EditAccount,
        role: Role,
        gender: Gender,
        uploaded: &mut Vec<String>,
    ) -> Result<Vec<String>, ServiceError> {
        let mut uow = self.store.begin().await?;
        let mut account = uow
            .accounts()
            .get_by_id(cmd.id)
            .await
            .map_err(not_found_as("account"))?;

        match (account.company.take(), cmd.has_company()) {
            (Some(mut company), true) => {
                if let Some(name) = &cmd.company_name {
                    company.name = name.clone();
                }
                if let Some(description) = &cmd.company_description {
                    company.description = description.clone();
                }
                uow.companies().update(&company).await?;
                account.company = Some(company);
            }
            (Some(company), false) => {
                uow.companies().delete(company.id).await?;
                account.company_id = None;
            }
            (None, true) => {
                let company = NewCompany {
                    name: cmd.company_name.clone().unwrap_or_default(),
                    description: cmd.company_description.clone().unwrap_or_default(),
                };
                let id = uow.companies().create(&company).await?;
                account.company = Some(uow.companies().get_by_id(id).await?);
                account.company_id = Some(id);
            }
            (None, false) => {}
        }

        let mut replaced = Vec::new();

        if let Some(file) = &cmd.avatar {
            let (id, old) = self
                .replace_attachment(uow.as_mut(), account.avatar.as_ref(), file, uploaded)
                .await?;
            account.avatar_id = Some(id);
            replaced.extend(old);
        }

        if let Some(file) = &cmd.document {
            let (id, old) = self
                .replace_attachment(uow.as_mut(), account.document.as_ref(), file, uploaded)
                .await?;
            account.document_id = Some(id);
            replaced.extend(old);
        }

        apply_profile(&mut account, cmd, role, gender);
        uow.accounts().update(&account).await?;

        if let Some(tags) = &cmd.tags {
            uow.tags().detach_all(account.id).await?;
            for tag in normalize_tags(tags) {
                uow.tags().attach(account.id, &tag).await?;
            }
        }

        if let Some(category_ids) = &cmd.category_ids {
            uow.categories().delete_from_account(account.id).await?;
            for category_id in category_ids {
                uow.categories().add_to_account(account.id, *category_id).await?;
            }
        }

        uow.commit().await?;
        Ok(replaced)
    }

    /// Upload a new blob and point the existing row at it, or create a row.
    /// Returns the row id and the file name of the blob it replaced, if any.
    async fn replace_attachment(
        &self,
        uow: &mut dyn UnitOfWork,
        current: Option<&Attachment>,
        file: &UploadFile,
        uploaded: &mut Vec<String>,
    ) -> Result<(i64, Option<String>), ServiceError> {
        let attachment = self.attachments.upload_and_prepare(file).await?;
        uploaded.push(attachment.file_name.clone());

        match current {
            Some(existing) => {
                uow.attachments().update(existing.id, &attachment).await?;
                Ok((existing.id, Some(existing.file_name.clone())))
            }
            None => {
                let id = uow.attachments().create(&attachment).await?;
                Ok((id, None))
            }
        }
    }

    /// Soft-delete an account together with its company and attachment rows.
    /// Blobs are kept.
    pub async fn delete_account(&self, id: i64) -> Result<(), ServiceError> {
        let mut uow = self.store.begin().await?;

        let account = uow
            .accounts()
            .get_by_id(id)
            .await
            .map_err(not_found_as("account"))?;

        uow.accounts().soft_delete(account.id).await?;

        if let Some(company) = &account.company {
            uow.companies().delete(company.id).await?;
        }
        for attachment in [&account.avatar, &account.document].into_iter().flatten() {
            uow.attachments().delete(attachment.id).await?;
        }

        uow.commit().await.map_err(|e| {
            tracing::error!("Failed to delete account {}: {}", id, e);
            e
        })?;

        tracing::info!("Deleted account {}", id);
        Ok(())
    }

    /// Standalone role update
    pub async fn change_role(&self, id: i64, role: Role) -> Result<(), ServiceError> {
        let mut session = self.store.session().await?;

        session
            .accounts()
            .update_role(id, role)
            .await
            .map_err(not_found_as("account"))?;

        tracing::info!("Changed role of account {} to {}", id, role);
        Ok(())
    }

    pub async fn get_account_details(&self, id: i64) -> Result<AccountDetails, ServiceError> {
        let mut session = self.store.session().await?;

        let account: Account = session
            .accounts()
            .get_by_id(id)
            .await
            .map_err(not_found_as("account"))?;
        let tags = session.tags().get_by_account_id(id).await?;
        let categories = session.categories().get_by_account_id(id).await?;

        Ok(AccountDetails {
            account,
            tags,
            categories,
        })
    }

    /// Role of an active account, read without its links
    pub async fn get_account_role(&self, id: i64) -> Result<Role, ServiceError> {
        let mut session = self.store.session().await?;

        let account = session
            .accounts()
            .get_by_id(id)
            .await
            .map_err(not_found_as("account"))?;

        Ok(account.role)
    }

    pub async fn account_has_role(&self, id: i64, role: Role) -> Result<bool, ServiceError> {
        Ok(self.get_account_role(id).await? == role)
    }
}

fn apply_profile(account: &mut Account, cmd: &EditAccount, role: Role, gender: Gender) {
    account.first_name = cmd.first_name.clone();
    account.middle_name = cmd.middle_name.clone();
    account.last_name = cmd.last_name.clone();
    account.nickname = cmd.nickname.clone();
    account.role = role;
    account.about_me = cmd.about_me.clone();
    account.gender = gender;
    account.country = cmd.country.clone();
    account.location = cmd.location.clone();
}

/// Trim and lower-case tags, dropping blanks and duplicates
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}
