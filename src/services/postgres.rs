use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use std::ops::DerefMut;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::models::domain::{
    Account, Attachment, CandidateQuery, Category, Company, DislikeAccount, LikeAccount,
    NewAccount, NewAttachment, NewCompany, NewTask, Ranking, Role, Tag, Task,
};
use crate::services::repository::{
    AccountRepository, AttachmentRepository, CategoryRepository, CompanyRepository,
    RelationshipRepository, Repositories, StoreError, TagRepository, TaskRepository,
    TransactionProvider, UnitOfWork,
};

/// Account columns with company and attachments resolved through LEFT JOINs.
/// Soft-deleted companies and attachments resolve to NULL.
const ACCOUNT_SELECT: &str = r#"
    SELECT
        a.id, a.telegram_id, a.first_name, a.middle_name, a.last_name, a.nickname,
        a.role, a.about_me, a.gender, a.country, a.location,
        a.created_at, a.updated_at, a.deleted_at,
        c.id AS company_ref, c.name AS company_name, c.description AS company_description,
        c.created_at AS company_created_at, c.updated_at AS company_updated_at,
        av.id AS avatar_ref, av.file_name AS avatar_file_name, av.path AS avatar_path,
        av.status AS avatar_status, av.created_at AS avatar_created_at,
        av.updated_at AS avatar_updated_at,
        doc.id AS document_ref, doc.file_name AS document_file_name, doc.path AS document_path,
        doc.status AS document_status, doc.created_at AS document_created_at,
        doc.updated_at AS document_updated_at
    FROM account a
    LEFT JOIN company c ON c.id = a.company_id AND c.deleted_at IS NULL
    LEFT JOIN attachment av ON av.id = a.avatar_id AND av.deleted_at IS NULL
    LEFT JOIN attachment doc ON doc.id = a.document_id AND doc.deleted_at IS NULL
"#;

const MATCHABLE_FILTER: &str = r#"
    WHERE a.role = $2
      AND a.id <> $1
      AND a.deleted_at IS NULL
      AND NOT EXISTS (
          SELECT 1 FROM like_account l WHERE l.liker_id = $1 AND l.liked_id = a.id
      )
      AND NOT EXISTS (
          SELECT 1 FROM dislike_account d WHERE d.disliker_id = $1 AND d.disliked_id = a.id
      )
"#;

/// PostgreSQL-backed transaction provider
///
/// Every call to [`TransactionProvider::begin`] opens one `sqlx` transaction and
/// binds all repositories to it; [`TransactionProvider::session`] binds them to a
/// pooled connection in autocommit mode.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings, running migrations when enabled
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!(
            "Connecting to PostgreSQL (max_connections={})",
            settings.max_connections
        );

        let store = Self::new(
            &settings.url,
            settings.max_connections,
            settings.min_connections,
            Duration::from_secs(settings.acquire_timeout_secs),
            Duration::from_secs(settings.idle_timeout_secs),
        )
        .await?;

        if settings.run_migrations {
            store.migrate().await?;
        }

        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl TransactionProvider for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgRepositories { conn: tx }))
    }

    async fn session(&self) -> Result<Box<dyn Repositories>, StoreError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgRepositories { conn }))
    }
}

/// All repositories over one connection-like handle
pub struct PgRepositories<C> {
    conn: C,
}

impl<C> Repositories for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
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
impl UnitOfWork for PgRepositories<Transaction<'static, Postgres>> {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.conn.commit().await?;
        Ok(())
    }
}

fn require_affected(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

fn map_account(row: &PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role")?;
    let gender: String = row.try_get("gender")?;

    let company = match row.try_get::<Option<i64>, _>("company_ref")? {
        Some(id) => Some(Company {
            id,
            name: row.try_get("company_name")?,
            description: row.try_get("company_description")?,
            created_at: row.try_get("company_created_at")?,
            updated_at: row.try_get("company_updated_at")?,
        }),
        None => None,
    };
    let avatar = map_joined_attachment(row, "avatar")?;
    let document = map_joined_attachment(row, "document")?;

    Ok(Account {
        id: row.try_get("id")?,
        telegram_id: row.try_get("telegram_id")?,
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get("middle_name")?,
        last_name: row.try_get("last_name")?,
        nickname: row.try_get("nickname")?,
        role: role.parse()?,
        about_me: row.try_get("about_me")?,
        gender: gender.parse()?,
        country: row.try_get("country")?,
        location: row.try_get("location")?,
        company_id: company.as_ref().map(|c| c.id),
        company,
        avatar_id: avatar.as_ref().map(|a| a.id),
        avatar,
        document_id: document.as_ref().map(|d| d.id),
        document,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn map_joined_attachment(row: &PgRow, prefix: &str) -> Result<Option<Attachment>, StoreError> {
    let id: Option<i64> = row.try_get(format!("{prefix}_ref").as_str())?;
    let Some(id) = id else {
        return Ok(None);
    };

    let status: String = row.try_get(format!("{prefix}_status").as_str())?;
    Ok(Some(Attachment {
        id,
        file_name: row.try_get(format!("{prefix}_file_name").as_str())?,
        path: row.try_get(format!("{prefix}_path").as_str())?,
        status: status.parse()?,
        created_at: row.try_get(format!("{prefix}_created_at").as_str())?,
        updated_at: row.try_get(format!("{prefix}_updated_at").as_str())?,
    }))
}

fn map_task(row: &PgRow) -> Result<Task, StoreError> {
    Ok(Task {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn order_clause(ranking: Ranking) -> &'static str {
    match ranking {
        Ranking::Exclusion => "ORDER BY a.id ASC",
        Ranking::SeenRating => "ORDER BY COALESCE(s.rating, -1) ASC, a.id ASC",
    }
}

#[async_trait]
impl<C> AccountRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn exists_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM account WHERE telegram_id = $1 AND deleted_at IS NULL)",
        )
        .bind(telegram_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }

    async fn is_deleted_with_telegram_id(&mut self, telegram_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM account WHERE telegram_id = $1 AND deleted_at IS NOT NULL)",
        )
        .bind(telegram_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }

    async fn create(&mut self, account: &NewAccount) -> Result<i64, StoreError> {
        let query = r#"
            INSERT INTO account (
                telegram_id, first_name, middle_name, last_name, nickname, role,
                about_me, gender, country, location, company_id, avatar_id, document_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
        "#;

        let row = sqlx::query(query)
            .bind(account.telegram_id)
            .bind(&account.first_name)
            .bind(&account.middle_name)
            .bind(&account.last_name)
            .bind(&account.nickname)
            .bind(account.role.as_str())
            .bind(&account.about_me)
            .bind(account.gender.as_str())
            .bind(&account.country)
            .bind(&account.location)
            .bind(account.company_id)
            .bind(account.avatar_id)
            .bind(account.document_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Account, StoreError> {
        let query = format!("{ACCOUNT_SELECT} WHERE a.id = $1 AND a.deleted_at IS NULL");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;

        map_account(&row)
    }

    async fn update(&mut self, account: &Account) -> Result<(), StoreError> {
        let query = r#"
            UPDATE account SET
                first_name = $2, middle_name = $3, last_name = $4, nickname = $5,
                role = $6, about_me = $7, gender = $8, country = $9, location = $10,
                company_id = $11, avatar_id = $12, document_id = $13, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
        "#;

        let result = sqlx::query(query)
            .bind(account.id)
            .bind(&account.first_name)
            .bind(&account.middle_name)
            .bind(&account.last_name)
            .bind(&account.nickname)
            .bind(account.role.as_str())
            .bind(&account.about_me)
            .bind(account.gender.as_str())
            .bind(&account.country)
            .bind(&account.location)
            .bind(account.company_id)
            .bind(account.avatar_id)
            .bind(account.document_id)
            .execute(&mut *self.conn)
            .await?;

        require_affected(result.rows_affected())
    }

    async fn update_role(&mut self, id: i64, role: Role) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE account SET role = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(role.as_str())
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }

    async fn soft_delete(&mut self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE account SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }

    async fn matchable(&mut self, query: &CandidateQuery) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "{ACCOUNT_SELECT} \
             LEFT JOIN account_seen s ON s.viewer_account_id = $1 AND s.viewed_account_id = a.id \
             {MATCHABLE_FILTER} {} LIMIT $3",
            order_clause(query.ranking)
        );

        let rows = sqlx::query(&sql)
            .bind(query.requester_id)
            .bind(query.target_role.as_str())
            .bind(query.limit)
            .fetch_all(&mut *self.conn)
            .await?;

        rows.iter().map(map_account).collect()
    }

    async fn count_matchable(&mut self, query: &CandidateQuery) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM account a {MATCHABLE_FILTER}");

        let row = sqlx::query(&sql)
            .bind(query.requester_id)
            .bind(query.target_role.as_str())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row.try_get(0)?)
    }

    async fn likers(
        &mut self,
        account_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "{ACCOUNT_SELECT} \
             JOIN like_account l ON l.liker_id = a.id \
             WHERE l.liked_id = $1 AND a.deleted_at IS NULL \
             ORDER BY l.created_at DESC, a.id ASC \
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.conn)
            .await?;

        rows.iter().map(map_account).collect()
    }

    async fn count_likers(&mut self, account_id: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM like_account l
            JOIN account a ON a.id = l.liker_id
            WHERE l.liked_id = $1 AND a.deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl<C> CompanyRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create(&mut self, company: &NewCompany) -> Result<i64, StoreError> {
        let row = sqlx::query("INSERT INTO company (name, description) VALUES ($1, $2) RETURNING id")
            .bind(&company.name)
            .bind(&company.description)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Company, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM company
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(Company {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn update(&mut self, company: &Company) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE company SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.description)
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }

    async fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE company SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }
}

#[async_trait]
impl<C> AttachmentRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn create(&mut self, attachment: &NewAttachment) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO attachment (file_name, path, status) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&attachment.file_name)
        .bind(&attachment.path)
        .bind(attachment.status.as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Attachment, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, file_name, path, status, created_at, updated_at
            FROM attachment
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        let status: String = row.try_get("status")?;
        Ok(Attachment {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            path: row.try_get("path")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn update(&mut self, id: i64, attachment: &NewAttachment) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attachment SET file_name = $2, path = $3, status = $4, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(&attachment.file_name)
        .bind(&attachment.path)
        .bind(attachment.status.as_str())
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }

    async fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE attachment SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        require_affected(result.rows_affected())
    }
}

#[async_trait]
impl<C> TagRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn attach(&mut self, account_id: i64, title: &str) -> Result<(), StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO tag (title) VALUES ($1)
            ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
            RETURNING id
            "#,
        )
        .bind(title)
        .fetch_one(&mut *self.conn)
        .await?;
        let tag_id: i64 = row.try_get("id")?;

        sqlx::query(
            "INSERT INTO account_tag (account_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(account_id)
        .bind(tag_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.title
            FROM tag t
            JOIN account_tag at ON at.tag_id = t.id
            WHERE at.account_id = $1
            ORDER BY t.title
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Tag {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                })
            })
            .collect()
    }

    async fn detach_all(&mut self, account_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM account_tag WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<C> CategoryRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn get_by_account_id(&mut self, account_id: i64) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.title
            FROM category c
            JOIN account_category ac ON ac.category_id = c.id
            WHERE ac.account_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                })
            })
            .collect()
    }

    async fn add_to_account(
        &mut self,
        account_id: i64,
        category_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account_category (account_id, category_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(category_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    async fn delete_from_account(&mut self, account_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM account_category WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<C> RelationshipRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn exists_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM like_account WHERE liker_id = $1 AND liked_id = $2)",
        )
        .bind(edge.liker_id)
        .bind(edge.liked_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }

    async fn like(&mut self, edge: LikeAccount) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO like_account (liker_id, liked_id) VALUES ($1, $2)")
            .bind(edge.liker_id)
            .bind(edge.liked_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    async fn delete_like(&mut self, edge: LikeAccount) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM like_account WHERE liker_id = $1 AND liked_id = $2")
            .bind(edge.liker_id)
            .bind(edge.liked_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM dislike_account WHERE disliker_id = $1 AND disliked_id = $2)",
        )
        .bind(edge.disliker_id)
        .bind(edge.disliked_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }

    async fn dislike(&mut self, edge: DislikeAccount) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO dislike_account (disliker_id, disliked_id) VALUES ($1, $2)")
            .bind(edge.disliker_id)
            .bind(edge.disliked_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    async fn delete_dislike(&mut self, edge: DislikeAccount) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM dislike_account WHERE disliker_id = $1 AND disliked_id = $2",
        )
        .bind(edge.disliker_id)
        .bind(edge.disliked_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_dislikes(
        &mut self,
        disliker_id: i64,
        before: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM dislike_account WHERE disliker_id = $1 AND created_at < $2",
        )
        .bind(disliker_id)
        .bind(before)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_seen(&mut self, viewer_id: i64, viewed_id: i64) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO account_seen (viewer_account_id, viewed_account_id, rating)
            VALUES ($1, $2, 0)
            ON CONFLICT (viewer_account_id, viewed_account_id)
            DO UPDATE SET rating = account_seen.rating + 1
        "#;

        sqlx::query(query)
            .bind(viewer_id)
            .bind(viewed_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl<C> TaskRepository for PgRepositories<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn lock_owner(&mut self, owner_id: i64) -> Result<(), StoreError> {
        sqlx::query("SELECT id FROM account WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(owner_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(())
    }

    async fn create(&mut self, task: &NewTask) -> Result<i64, StoreError> {
        let row = sqlx::query(
            "INSERT INTO task (owner_id, title, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get("id")?)
    }

    async fn get_by_id(&mut self, id: i64) -> Result<Task, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, created_at, updated_at
            FROM task
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;

        map_task(&row)
    }

    async fn count_by_owner(&mut self, owner_id: i64) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*)
            FROM task t
            JOIN account a ON a.id = t.owner_id AND a.deleted_at IS NULL
            WHERE t.owner_id = $1 AND t.deleted_at IS NULL
            "#,
        )
        .bind(owner_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(row.try_get(0)?)
    }

    async fn list_by_owner(
        &mut self,
        owner_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.owner_id, t.title, t.description, t.created_at, t.updated_at
            FROM task t
            JOIN account a ON a.id = t.owner_id AND a.deleted_at IS NULL
            WHERE t.owner_id = $1 AND t.deleted_at IS NULL
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(map_task).collect()
    }
}
