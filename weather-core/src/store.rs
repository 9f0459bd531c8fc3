//! User document storage.
//!
//! One document per user: identity, password hash and the ordered saved
//! location list. Writes are whole-list replacements without versioning, so
//! concurrent saved-location edits on the same user are last-write-wins.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rusqlite::{Connection, OptionalExtension, params};
use std::{collections::HashMap, fmt::Debug, path::Path, sync::Arc};

use crate::{
    error::StoreError,
    model::{NewUser, SavedLocation, User},
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// `email` must already be normalized (trimmed, lowercase).
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Assigns id and timestamps. Fails with [`StoreError::DuplicateEmail`]
    /// when the email is taken.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    /// Replaces the user's saved-location list.
    async fn update_saved_locations(
        &self,
        id: &str,
        locations: &[SavedLocation],
    ) -> StoreResult<()>;
}

/// Open the store named by a `database.uri` value.
pub fn open_store(uri: &str) -> anyhow::Result<Arc<dyn UserStore>> {
    if uri == "memory:" {
        tracing::info!("Using in-memory user store");
        return Ok(Arc::new(MemoryUserStore::new()));
    }

    if let Some(path) = uri.strip_prefix("sqlite://") {
        tracing::info!(path, "Using SQLite user store");
        return Ok(Arc::new(SqliteUserStore::open(path)?));
    }

    Err(anyhow::anyhow!(
        "Unsupported database URI '{uri}'. Use `memory:` or `sqlite://<path>`."
    ))
}

fn new_document(user: NewUser) -> User {
    let now = Utc::now();
    User {
        id: uuid::Uuid::new_v4().to_string(),
        name: user.name,
        email: user.email,
        password_hash: user.password_hash,
        saved_locations: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Process-local store. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let doc = new_document(user);
        users.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn update_saved_locations(
        &self,
        id: &str,
        locations: &[SavedLocation],
    ) -> StoreResult<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(id)
            .ok_or_else(|| StoreError::UserNotFound(id.to_string()))?;

        user.saved_locations = locations.to_vec();
        user.updated_at = Utc::now();
        Ok(())
    }
}

/// SQLite-backed store. The saved-location list is kept as a JSON document
/// column next to the scalar user fields. Every statement runs on the
/// blocking pool; the connection is shared behind a mutex.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_USER: &str = "SELECT id, name, email, password_hash, saved_locations, \
                           created_at, updated_at FROM users";

impl SqliteUserStore {
    /// Open (or create) the database file and its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                saved_locations TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn find_where(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<User>> {
    let sql = format!("{SELECT_USER} WHERE {column} = ?1");

    let row = conn
        .query_row(&sql, params![value], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .optional()?;

    let Some((id, name, email, password_hash, locations, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(User {
        id,
        name,
        email,
        password_hash,
        saved_locations: serde_json::from_str(&locations)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    }))
}

fn parse_timestamp(s: &str) -> StoreResult<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("bad timestamp '{s}': {e}")))
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let id = id.to_string();
        self.with_conn(move |conn| find_where(conn, "id", &id)).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| find_where(conn, "email", &email)).await
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let doc = new_document(user);

        self.with_conn(move |conn| {
            let res = conn.execute(
                "INSERT INTO users \
                 (id, name, email, password_hash, saved_locations, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?6)",
                params![
                    doc.id,
                    doc.name,
                    doc.email,
                    doc.password_hash,
                    doc.created_at.to_rfc3339(),
                    doc.updated_at.to_rfc3339(),
                ],
            );

            match res {
                Ok(_) => Ok(doc),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::DuplicateEmail)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn update_saved_locations(
        &self,
        id: &str,
        locations: &[SavedLocation],
    ) -> StoreResult<()> {
        let json = serde_json::to_string(locations)?;
        let id = id.to_string();

        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET saved_locations = ?1, updated_at = ?2 WHERE id = ?3",
                params![json, Utc::now().to_rfc3339(), id],
            )?;

            if changed == 0 {
                return Err(StoreError::UserNotFound(id));
            }
            Ok(())
        })
        .await
    }
}
