use {
    async_trait::async_trait,
    relaydesk_channels::{
        Error, ForwardRecord, ProfileStore, ProfileUpdate, Result, UserDirectory, UserProfile,
    },
    relaydesk_common::{Identity, MessageRef},
    sqlx::SqlitePool,
    tracing::debug,
};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ProfileRow {
    full_name: Option<String>,
    username: Option<String>,
    language: Option<String>,
    display_name: Option<String>,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            full_name: r.full_name,
            username: r.username,
            language: r.language,
            display_name: r.display_name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ForwardRow {
    agent: i64,
    forwarded_id: i64,
    from_id: i64,
    original_id: i64,
    sender_name: String,
    text: Option<String>,
    created_at: i64,
}

impl From<ForwardRow> for ForwardRecord {
    fn from(r: ForwardRow) -> Self {
        Self {
            agent: Identity::new(r.agent),
            forwarded: MessageRef(r.forwarded_id as i32),
            from: Identity::new(r.from_id),
            original: MessageRef(r.original_id as i32),
            sender_name: r.sender_name,
            text: r.text,
            at: r.created_at,
        }
    }
}

/// Open (creating if needed) the database at `database_url`.
pub async fn open_pool(database_url: &str) -> std::result::Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePool::connect(database_url).await?;
    debug!(database_url, "opened profile database");
    Ok(pool)
}

/// SQLite-backed profile store.
///
/// Every user who ever saved a profile field shows up in the directory,
/// which is what `/broadcast` walks.
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the profile and forwarded-message tables if they do not exist yet.
    pub async fn init(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS profiles (
                id           INTEGER PRIMARY KEY,
                full_name    TEXT,
                username     TEXT,
                language     TEXT,
                display_name TEXT,
                created_at   INTEGER NOT NULL,
                updated_at   INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS forwarded_messages (
                agent        INTEGER NOT NULL,
                forwarded_id INTEGER NOT NULL,
                from_id      INTEGER NOT NULL,
                original_id  INTEGER NOT NULL,
                sender_name  TEXT    NOT NULL,
                text         TEXT,
                created_at   INTEGER NOT NULL,
                PRIMARY KEY (agent, forwarded_id)
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn save_profile(&self, id: Identity, update: ProfileUpdate) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"INSERT INTO profiles (id, full_name, username, language, display_name, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 full_name = COALESCE(excluded.full_name, profiles.full_name),
                 username = COALESCE(excluded.username, profiles.username),
                 language = COALESCE(excluded.language, profiles.language),
                 display_name = COALESCE(excluded.display_name, profiles.display_name),
                 updated_at = excluded.updated_at"#,
        )
        .bind(id.get())
        .bind(&update.full_name)
        .bind(&update.username)
        .bind(&update.language)
        .bind(&update.display_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::external("save profile", e))?;
        Ok(())
    }

    async fn get_profile(&self, id: Identity) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT full_name, username, language, display_name FROM profiles WHERE id = ?",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::external("load profile", e))?;
        Ok(row.map(Into::into))
    }

    async fn record_forward(&self, record: ForwardRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT OR REPLACE INTO forwarded_messages
               (agent, forwarded_id, from_id, original_id, sender_name, text, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.agent.get())
        .bind(record.forwarded.0)
        .bind(record.from.get())
        .bind(record.original.0)
        .bind(&record.sender_name)
        .bind(&record.text)
        .bind(record.at)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::external("record forward", e))?;
        Ok(())
    }

    async fn get_forward(
        &self,
        agent: Identity,
        forwarded: MessageRef,
    ) -> Result<Option<ForwardRecord>> {
        let row = sqlx::query_as::<_, ForwardRow>(
            "SELECT * FROM forwarded_messages WHERE agent = ? AND forwarded_id = ?",
        )
        .bind(agent.get())
        .bind(forwarded.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::external("load forward", e))?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl UserDirectory for SqliteProfileStore {
    async fn list_users(&self) -> Result<Vec<Identity>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::external("list users", e))?;
        Ok(ids.into_iter().map(Identity::new).collect())
    }
}
