// Shared in-memory backends for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tonify_backend::core::{AccountCoordinator, AttachmentManager, MatchEngine, TaskService};
use tonify_backend::models::{
    Account, Attachment, CandidateQuery, Category, Company, CreateAccount, DislikeAccount, Gender,
    LikeAccount, NewAccount, NewAttachment, NewCompany, NewTask, Ranking, Role, Tag, Task,
    UploadFile,
};
use tonify_backend::services::{
    AccountRepository, AttachmentRepository, CategoryRepository, CompanyRepository, FileStorage,
    RelationshipRepository, Repositories, StorageError, StoreError, TagRepository, TaskRepository,
    TransactionProvider, UnitOfWork,
};

#[derive(Debug, Clone)]
pub struct StoredCompany {
    pub company: Company,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub attachment: Attachment,
    pub deleted: bool,
}

/// Whole database contents. Transactions work on a clone and swap it in on commit.
#[derive(Debug, Clone)]
pub struct State {
    next_id: i64,
    pub accounts: BTreeMap<i64, Account>,
    pub companies: BTreeMap<i64, StoredCompany>,
    pub attachments: BTreeMap<i64, StoredAttachment>,
    pub tags: BTreeMap<i64, String>,
    pub account_tags: BTreeSet<(i64, i64)>,
    pub categories: BTreeMap<i64, String>,
    pub account_categories: BTreeSet<(i64, i64)>,
    pub likes: BTreeMap<(i64, i64), DateTime<Utc>>,
    pub dislikes: BTreeMap<(i64, i64), DateTime<Utc>>,
    pub seen: BTreeMap<(i64, i64), i32>,
    pub tasks: BTreeMap<i64, Task>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 1000,
            accounts: BTreeMap::new(),
            companies: BTreeMap::new(),
            attachments: BTreeMap::new(),
            tags: BTreeMap::new(),
            account_tags: BTreeSet::new(),
            categories: BTreeMap::new(),
            account_categories: BTreeSet::new(),
            likes: BTreeMap::new(),
            dislikes: BTreeMap::new(),
            seen: BTreeMap::new(),
            tasks: BTreeMap::new(),
        }
    }
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_account(&self, id: i64) -> Option<&Account> {
        self.accounts.get(&id).filter(|a| a.deleted_at.is_none())
    }

    fn active_company(&self, id: i64) -> Option<&Company> {
        self.companies
            .get(&id)
            .filter(|c| !c.deleted)
            .map(|c| &c.company)
    }

    fn active_attachment(&self, id: i64) -> Option<&Attachment> {
        self.attachments
            .get(&id)
            .filter(|a| !a.deleted)
            .map(|a| &a.attachment)
    }

    /// Account with company and attachments resolved the way a LEFT JOIN would
    fn resolve(&self, account: &Account) -> Account {
        let mut account = account.clone();
        account.company = account
            .company_id
            .and_then(|id| self.active_company(id).cloned());
        account.company_id = account.company.as_ref().map(|c| c.id);
        account.avatar = account
            .avatar_id
            .and_then(|id| self.active_attachment(id).cloned());
        account.avatar_id = account.avatar.as_ref().map(|a| a.id);
        account.document = account
            .document_id
            .and_then(|id| self.active_attachment(id).cloned());
        account.document_id = account.document.as_ref().map(|d| d.id);
        account
    }

    fn is_matchable(&self, query: &CandidateQuery, account: &Account) -> bool {
        account.role == query.target_role
            && account.id != query.requester_id
            && account.deleted_at.is_none()
            && !self.likes.contains_key(&(query.requester_id, account.id))
            && !self.dislikes.contains_key(&(query.requester_id, account.id))
    }

    /// Tasks of an active owner, newest first
    fn owner_tasks(&self, owner_id: i64) -> Vec<&Task> {
        if self.active_account(owner_id).is_none() {
            return Vec::new();
        }
        self.tasks
            .values()
            .rev()
            .filter(|t| t.owner_id == owner_id)
            .collect()
    }

    pub fn active_account_ids(&self) -> Vec<i64> {
        self.accounts
            .values()
            .filter(|a| a.deleted_at.is_none())
            .map(|a| a.id)
            .collect()
    }

    pub fn tag_titles_of(&self, account_id: i64) -> Vec<String> {
        let mut titles: Vec<String> = self
            .account_tags
            .iter()
            .filter(|(a, _)| *a == account_id)
            .filter_map(|(_, t)| self.tags.get(t).cloned())
            .collect();
        titles.sort();
        titles
    }

    pub fn category_ids_of(&self, account_id: i64) -> Vec<i64> {
        self.account_categories
            .iter()
            .filter(|(a, _)| *a == account_id)
            .map(|(_, c)| *c)
            .collect()
    }
}

/// Switches that make specific store operations fail
#[derive(Debug, Default)]
pub struct Faults {
    pub fail_commit: bool,
    pub fail_ops: HashSet<&'static str>,
    pub fail_tag_lookup_for: HashSet<i64>,
    pub fail_mark_seen: bool,
}

/// In-memory transaction provider
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> State {
        self.state.lock().unwrap().clone()
    }

    pub fn fail_commit(&self, fail: bool) {
        self.faults.lock().unwrap().fail_commit = fail;
    }

    pub fn fail_op(&self, op: &'static str) {
        self.faults.lock().unwrap().fail_ops.insert(op);
    }

    pub fn fail_tag_lookup_for(&self, account_id: i64) {
        self.faults.lock().unwrap().fail_tag_lookup_for.insert(account_id);
    }

    pub fn fail_mark_seen(&self, fail: bool) {
        self.faults.lock().unwrap().fail_mark_seen = fail;
    }

    pub fn seed_category(&self, id: i64, title: &str) {
        self.state
            .lock()
            .unwrap()
            .categories
            .insert(id, title.to_string());
    }

    /// Insert an active account with a fixed id
    pub fn seed_account(&self, id: i64, role: Role) {
        let now = Utc::now();
        let account = Account {
            id,
            telegram_id: id * 100,
            first_name: format!("First{id}"),
            middle_name: None,
            last_name: format!("Last{id}"),
            nickname: None,
            role,
            about_me: None,
            gender: Gender::Female,
            country: None,
            location: None,
            company_id: None,
            company: None,
            avatar_id: None,
            avatar: None,
            document_id: None,
            document: None,
            created_at: Some(now),
            updated_at: Some(now),
            deleted_at: None,
        };
        self.state.lock().unwrap().accounts.insert(id, account);
    }

    pub fn seed_tag(&self, account_id: i64, title: &str) {
        let mut state = self.state.lock().unwrap();
        let tag_id = state.allocate_id();
        state.tags.insert(tag_id, title.to_string());
        state.account_tags.insert((account_id, tag_id));
    }

    pub fn insert_like(&self, liker_id: i64, liked_id: i64) {
        self.state
            .lock()
            .unwrap()
            .likes
            .insert((liker_id, liked_id), Utc::now());
    }

    pub fn insert_dislike_at(&self, disliker_id: i64, disliked_id: i64, at: DateTime<Utc>) {
        self.state
            .lock()
            .unwrap()
            .dislikes
            .insert((disliker_id, disliked_id), at);
    }

    pub fn soft_delete_account(&self, id: i64) {
        if let Some(account) = self.state.lock().unwrap().accounts.get_mut(&id) {
            account.deleted_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl TransactionProvider for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let working = self.snapshot();
        Ok(Box::new(MemoryRepos {
            target: Target::Transaction {
                working,
                shared: self.state.clone(),
            },
            faults: self.faults.clone(),
        }))
    }

    async fn session(&self) -> Result<Box<dyn Repositories>, StoreError> {
        Ok(Box::new(MemoryRepos {
            target: Target::Session(self.state.clone()),
            faults: self.faults.clone(),
        }))
    }
}

enum Target {
    Transaction {
        working: State,
        shared: Arc<Mutex<State>>,
    },
    Session(Arc<Mutex<State>>),
}

pub struct MemoryRepos {
    target: Target,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryRepos {
    fn with_state<R>(&mut self, f: impl FnOnce(&mut State) -> R) -> R {
        match &mut self.target {
            Target::Transaction { working, .. } => f(working),
            Target::Session(shared) => f(&mut *shared.lock().unwrap()),
        }
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.faults.lock().unwrap().fail_ops.contains(op) {
            return Err(StoreError::Backend(format!("injected failure in {op}")));
        }
        Ok(())
    }
}

impl Repositories for MemoryRepos {
    fn accounts(&mut self) -> &mut dyn AccountRepository {
        self
    }

    fn companies(&mut self) -> &mut dyn CompanyRepository {
        self
    }

    fn attachments(&mut self) -> &mut dyn AttachmentRepository {
        self
    }

    fn tags(&mut self) -> &mut dyn TagRepository {
        self
    }

    fn categories(&mut self) -> &mut dyn CategoryRepository {
        self
    }

    fn relations(&mut self) -> &mut dyn RelationshipRepository {
        self
    }

    fn tasks(&mut self) -> &mut dyn TaskRepository {
        self
    }
}

#[async_trait]
impl UnitOfWork for MemoryRepos {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.faults.lock().unwrap().fail_commit {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }

        let this = *self;
        match this.target {
            Target::Transaction { working, shared } => {
                *shared.lock().unwrap() = working;
                Ok(())
            }
            Target::Session(_) => Ok(()),
        }
    }
}

#[async_trait]
impl AccountRepository for MemoryRepos {
    async fn exists_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| {
            s.accounts
                .values()
                .any(|a| a.telegram_id == telegram_id && a.deleted_at.is_none())
        }))
    }

    async fn is_deleted_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| {
            s.accounts
                .values()
                .any(|a| a.telegram_id == telegram_id && a.deleted_at.is_some())
        }))
    }

    async fn create(&mut self, account: &NewAccount) -> Result<i64, StoreError> {
        self.check("accounts.create")?;
        self.with_state(|s| {
            if s.accounts.values().any(|a| a.telegram_id == account.telegram_id) {
                return Err(StoreError::UniqueViolation("account_telegram_id_key".into()));
            }

            let id = s.allocate_id();
            let now = Utc::now();
            s.accounts.insert(
                id,
                Account {
                    id,
                    telegram_id: account.telegram_id,
                    first_name: account.first_name.clone(),
                    middle_name: account.middle_name.clone(),
                    last_name: account.last_name.clone(),
                    nickname: account.nickname.clone(),
                    role: account.role,
                    about_me: account.about_me.clone(),
                    gender: account.gender,
                    country: account.country.clone(),
                    location: account.location.clone(),
                    company_id: account.company_id,
                    company: None,
                    avatar_id: account.avatar_id,
                    avatar: None,
                    document_id: account.document_id,
                    document: None,
                    created_at: Some(now),
                    updated_at: Some(now),
                    deleted_at: None,
                },
            );
            Ok(id)
        })
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Account, StoreError> {
        self.with_state(|s| {
            s.active_account(id)
                .map(|a| s.resolve(a))
                .ok_or(StoreError::NotFound)
        })
    }

    async fn update(&mut self, account: &Account) -> Result<(), StoreError> {
        self.check("accounts.update")?;
        self.with_state(|s| {
            let stored = s
                .accounts
                .get_mut(&account.id)
                .filter(|a| a.deleted_at.is_none())
                .ok_or(StoreError::NotFound)?;

            stored.first_name = account.first_name.clone();
            stored.middle_name = account.middle_name.clone();
            stored.last_name = account.last_name.clone();
            stored.nickname = account.nickname.clone();
            stored.role = account.role;
            stored.about_me = account.about_me.clone();
            stored.gender = account.gender;
            stored.country = account.country.clone();
            stored.location = account.location.clone();
            stored.company_id = account.company_id;
            stored.avatar_id = account.avatar_id;
            stored.document_id = account.document_id;
            stored.updated_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn update_role(&mut self, id: i64, role: Role) -> Result<(), StoreError> {
        self.with_state(|s| {
            let stored = s
                .accounts
                .get_mut(&id)
                .filter(|a| a.deleted_at.is_none())
                .ok_or(StoreError::NotFound)?;
            stored.role = role;
            Ok(())
        })
    }

    async fn soft_delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.with_state(|s| {
            let stored = s
                .accounts
                .get_mut(&id)
                .filter(|a| a.deleted_at.is_none())
                .ok_or(StoreError::NotFound)?;
            stored.deleted_at = Some(Utc::now());
            Ok(())
        })
    }

    async fn matchable(&mut self, query: &CandidateQuery) -> Result<Vec<Account>, StoreError> {
        self.check("accounts.matchable")?;
        Ok(self.with_state(|s| {
            let mut candidates: Vec<&Account> = s
                .accounts
                .values()
                .filter(|a| s.is_matchable(query, a))
                .collect();

            if query.ranking == Ranking::SeenRating {
                candidates.sort_by_key(|a| {
                    let rating = s
                        .seen
                        .get(&(query.requester_id, a.id))
                        .copied()
                        .unwrap_or(-1);
                    (rating, a.id)
                });
            }

            candidates
                .into_iter()
                .take(query.limit.max(0) as usize)
                .map(|a| s.resolve(a))
                .collect()
        }))
    }

    async fn count_matchable(&mut self, query: &CandidateQuery) -> Result<i64, StoreError> {
        Ok(self.with_state(|s| {
            s.accounts
                .values()
                .filter(|a| s.is_matchable(query, a))
                .count() as i64
        }))
    }

    async fn likers(
        &mut self,
        account_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError> {
        Ok(self.with_state(|s| {
            let mut edges: Vec<(DateTime<Utc>, i64)> = s
                .likes
                .iter()
                .filter(|((_, liked), _)| *liked == account_id)
                .filter(|((liker, _), _)| s.active_account(*liker).is_some())
                .map(|((liker, _), at)| (*at, *liker))
                .collect();
            edges.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            edges
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .filter_map(|(_, id)| s.active_account(id).map(|a| s.resolve(a)))
                .collect()
        }))
    }

    async fn count_likers(&mut self, account_id: i64) -> Result<i64, StoreError> {
        Ok(self.with_state(|s| {
            s.likes
                .keys()
                .filter(|(liker, liked)| *liked == account_id && s.active_account(*liker).is_some())
                .count() as i64
        }))
    }
}

#[async_trait]
impl CompanyRepository for MemoryRepos {
    async fn create(&mut self, company: &NewCompany) -> Result<i64, StoreError> {
        self.check("companies.create")?;
        Ok(self.with_state(|s| {
            let id = s.allocate_id();
            s.companies.insert(
                id,
                StoredCompany {
                    company: Company {
                        id,
                        name: company.name.clone(),
                        description: company.description.clone(),
                        created_at: Some(Utc::now()),
                        updated_at: Some(Utc::now()),
                    },
                    deleted: false,
                },
            );
            id
        }))
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Company, StoreError> {
        self.with_state(|s| s.active_company(id).cloned().ok_or(StoreError::NotFound))
    }

    async fn update(&mut self, company: &Company) -> Result<(), StoreError> {
        self.with_state(|s| {
            let stored = s
                .companies
                .get_mut(&company.id)
                .filter(|c| !c.deleted)
                .ok_or(StoreError::NotFound)?;
            stored.company.name = company.name.clone();
            stored.company.description = company.description.clone();
            Ok(())
        })
    }

    async fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.with_state(|s| {
            let stored = s
                .companies
                .get_mut(&id)
                .filter(|c| !c.deleted)
                .ok_or(StoreError::NotFound)?;
            stored.deleted = true;
            Ok(())
        })
    }
}

#[async_trait]
impl AttachmentRepository for MemoryRepos {
    async fn create(&mut self, attachment: &NewAttachment) -> Result<i64, StoreError> {
        self.check("attachments.create")?;
        Ok(self.with_state(|s| {
            let id = s.allocate_id();
            s.attachments.insert(
                id,
                StoredAttachment {
                    attachment: Attachment {
                        id,
                        file_name: attachment.file_name.clone(),
                        path: attachment.path.clone(),
                        status: attachment.status,
                        created_at: Some(Utc::now()),
                        updated_at: Some(Utc::now()),
                    },
                    deleted: false,
                },
            );
            id
        }))
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Attachment, StoreError> {
        self.with_state(|s| s.active_attachment(id).cloned().ok_or(StoreError::NotFound))
    }

    async fn update(&mut self, id: i64, attachment: &NewAttachment) -> Result<(), StoreError> {
        self.check("attachments.update")?;
        self.with_state(|s| {
            let stored = s
                .attachments
                .get_mut(&id)
                .filter(|a| !a.deleted)
                .ok_or(StoreError::NotFound)?;
            stored.attachment.file_name = attachment.file_name.clone();
            stored.attachment.path = attachment.path.clone();
            stored.attachment.status = attachment.status;
            Ok(())
        })
    }

    async fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.with_state(|s| {
            let stored = s
                .attachments
                .get_mut(&id)
                .filter(|a| !a.deleted)
                .ok_or(StoreError::NotFound)?;
            stored.deleted = true;
            Ok(())
        })
    }
}

#[async_trait]
impl TagRepository for MemoryRepos {
    async fn attach(&mut self, account_id: i64, title: &str) -> Result<(), StoreError> {
        self.check("tags.attach")?;
        self.with_state(|s| {
            let existing = s
                .tags
                .iter()
                .find(|(_, t)| t.as_str() == title)
                .map(|(id, _)| *id);
            let tag_id = match existing {
                Some(id) => id,
                None => {
                    let id = s.allocate_id();
                    s.tags.insert(id, title.to_string());
                    id
                }
            };
            s.account_tags.insert((account_id, tag_id));
        });
        Ok(())
    }

    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Tag>, StoreError> {
        if self
            .faults
            .lock()
            .unwrap()
            .fail_tag_lookup_for
            .contains(&account_id)
        {
            return Err(StoreError::Backend(format!(
                "injected tag lookup failure for {account_id}"
            )));
        }

        Ok(self.with_state(|s| {
            let mut tags: Vec<Tag> = s
                .account_tags
                .iter()
                .filter(|(a, _)| *a == account_id)
                .filter_map(|(_, t)| {
                    s.tags.get(t).map(|title| Tag {
                        id: *t,
                        title: title.clone(),
                    })
                })
                .collect();
            tags.sort_by(|a, b| a.title.cmp(&b.title));
            tags
        }))
    }

    async fn detach_all(&mut self, account_id: i64) -> Result<(), StoreError> {
        self.with_state(|s| s.account_tags.retain(|(a, _)| *a != account_id));
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryRepos {
    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Category>, StoreError> {
        Ok(self.with_state(|s| {
            s.account_categories
                .iter()
                .filter(|(a, _)| *a == account_id)
                .filter_map(|(_, c)| {
                    s.categories.get(c).map(|title| Category {
                        id: *c,
                        title: title.clone(),
                    })
                })
                .collect()
        }))
    }

    async fn add_to_account(
        &mut self,
        account_id: i64,
        category_id: i64,
    ) -> Result<(), StoreError> {
        self.with_state(|s| {
            if !s.categories.contains_key(&category_id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "category {category_id} does not exist"
                )));
            }
            s.account_categories.insert((account_id, category_id));
            Ok(())
        })
    }

    async fn delete_from_account(&mut self, account_id: i64) -> Result<(), StoreError> {
        self.with_state(|s| s.account_categories.retain(|(a, _)| *a != account_id));
        Ok(())
    }
}

#[async_trait]
impl RelationshipRepository for MemoryRepos {
    async fn exists_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| s.likes.contains_key(&(edge.liker_id, edge.liked_id))))
    }

    async fn like(&mut self, edge: LikeAccount) -> Result<(), StoreError> {
        self.check("relations.like")?;
        self.with_state(|s| {
            let key = (edge.liker_id, edge.liked_id);
            if s.likes.contains_key(&key) {
                return Err(StoreError::UniqueViolation("like_account_pkey".into()));
            }
            s.likes.insert(key, Utc::now());
            Ok(())
        })
    }

    async fn delete_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| s.likes.remove(&(edge.liker_id, edge.liked_id)).is_some()))
    }

    async fn exists_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| {
            s.dislikes
                .contains_key(&(edge.disliker_id, edge.disliked_id))
        }))
    }

    async fn dislike(&mut self, edge: DislikeAccount) -> Result<(), StoreError> {
        self.check("relations.dislike")?;
        self.with_state(|s| {
            let key = (edge.disliker_id, edge.disliked_id);
            if s.dislikes.contains_key(&key) {
                return Err(StoreError::UniqueViolation("dislike_account_pkey".into()));
            }
            s.dislikes.insert(key, Utc::now());
            Ok(())
        })
    }

    async fn delete_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError> {
        Ok(self.with_state(|s| {
            s.dislikes
                .remove(&(edge.disliker_id, edge.disliked_id))
                .is_some()
        }))
    }

    async fn delete_expired_dislikes(
        &mut self,
        disliker_id: i64,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.with_state(|s| {
            let initial = s.dislikes.len();
            s.dislikes
                .retain(|(disliker, _), at| !(*disliker == disliker_id && *at < before));
            (initial - s.dislikes.len()) as u64
        }))
    }

    async fn mark_seen(&mut self, viewer_id: i64, viewed_id: i64) -> Result<(), StoreError> {
        if self.faults.lock().unwrap().fail_mark_seen {
            return Err(StoreError::Backend("injected mark_seen failure".into()));
        }

        self.with_state(|s| {
            s.seen
                .entry((viewer_id, viewed_id))
                .and_modify(|rating| *rating += 1)
                .or_insert(0);
        });
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryRepos {
    async fn lock_owner(&mut self, owner_id: i64) -> Result<(), StoreError> {
        self.with_state(|s| {
            s.active_account(owner_id)
                .map(|_| ())
                .ok_or(StoreError::NotFound)
        })
    }

    async fn create(&mut self, task: &NewTask) -> Result<i64, StoreError> {
        self.check("tasks.create")?;
        Ok(self.with_state(|s| {
            let id = s.allocate_id();
            let now = Utc::now();
            s.tasks.insert(
                id,
                Task {
                    id,
                    owner_id: task.owner_id,
                    title: task.title.clone(),
                    description: task.description.clone(),
                    created_at: Some(now),
                    updated_at: Some(now),
                },
            );
            id
        }))
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Task, StoreError> {
        self.with_state(|s| s.tasks.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    async fn count_by_owner(&mut self, owner_id: i64) -> Result<i64, StoreError> {
        Ok(self.with_state(|s| s.owner_tasks(owner_id).len() as i64))
    }

    async fn list_by_owner(
        &mut self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(self.with_state(|s| {
            s.owner_tasks(owner_id)
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .cloned()
                .collect()
        }))
    }
}

#[derive(Debug, Default)]
struct StorageState {
    blobs: BTreeMap<String, Vec<u8>>,
    uploads: usize,
    fail_upload_at: Option<usize>,
    fail_delete: bool,
    upload_delay: Option<Duration>,
    delete_delay: Option<Duration>,
    deleted: Vec<String>,
}

/// In-memory blob storage with failure injection
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<StorageState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th upload (1-based)
    pub fn fail_upload_at(&self, n: usize) {
        self.inner.lock().unwrap().fail_upload_at = Some(n);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.inner.lock().unwrap().fail_delete = fail;
    }

    pub fn delay_uploads(&self, delay: Duration) {
        self.inner.lock().unwrap().upload_delay = Some(delay);
    }

    pub fn delay_deletes(&self, delay: Duration) {
        self.inner.lock().unwrap().delete_delay = Some(delay);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().unwrap().blobs.contains_key(name)
    }

    pub fn blob_names(&self) -> Vec<String> {
        self.inner.lock().unwrap().blobs.keys().cloned().collect()
    }

    /// Names passed to `delete`, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn put(&self, name: &str, content: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .blobs
            .insert(name.to_string(), content.to_vec());
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn upload(&self, name: &str, content: &[u8]) -> Result<String, StorageError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.uploads += 1;
            if inner.fail_upload_at == Some(inner.uploads) {
                return Err(StorageError::Upload(format!("injected failure for {name}")));
            }
            inner.upload_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.inner
            .lock()
            .unwrap()
            .blobs
            .insert(name.to_string(), content.to_vec());
        Ok(format!("memory://tonify/{name}"))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let delay = self.inner.lock().unwrap().delete_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.deleted.push(name.to_string());
        if inner.fail_delete {
            return Err(StorageError::Delete(format!("injected failure for {name}")));
        }
        inner.blobs.remove(name);
        Ok(())
    }
}

/// Coordinator and engine wired to the in-memory backends
pub struct Harness {
    pub store: MemoryStore,
    pub storage: Arc<MemoryStorage>,
    pub coordinator: AccountCoordinator,
    pub engine: MatchEngine,
    pub tasks: TaskService,
}

pub fn harness() -> Harness {
    harness_with(Ranking::Exclusion, Duration::from_secs(5))
}

pub fn harness_with(ranking: Ranking, upload_timeout: Duration) -> Harness {
    let store = MemoryStore::new();
    let storage = Arc::new(MemoryStorage::new());

    let provider: Arc<dyn TransactionProvider> = Arc::new(store.clone());
    let blob_storage: Arc<dyn FileStorage> = storage.clone();

    let attachments = AttachmentManager::new(blob_storage, upload_timeout);
    let coordinator = AccountCoordinator::new(provider.clone(), attachments);
    let tasks = TaskService::new(provider.clone(), 3);
    let engine = MatchEngine::new(provider, chrono::Duration::days(1), ranking);

    Harness {
        store,
        storage,
        coordinator,
        engine,
        tasks,
    }
}

pub fn create_command(telegram_id: i64, role: Role) -> CreateAccount {
    CreateAccount {
        telegram_id,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role: role.as_str().to_string(),
        gender: "female".to_string(),
        ..Default::default()
    }
}

pub fn file(name: &str) -> UploadFile {
    UploadFile::new(name, name.as_bytes().to_vec())
}
