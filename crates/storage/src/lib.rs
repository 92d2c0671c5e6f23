use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use std::{fs, path::Path, str::FromStr, time::Duration};

mod models;
mod repo;

pub use repo::comments::{LikeOutcome, NewComment, StatusUpdate, TransitionOutcome};
pub use repo::stats::TOP_ARTICLES_LIMIT;

#[derive(Debug, Clone)]
pub struct DbOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits for the database write lock before failing.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
}

impl Db {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::connect(db_url, &DbOptions::default()).await
    }

    pub async fn connect(db_url: &str, options: &DbOptions) -> anyhow::Result<Self> {
        let in_memory = db_url.contains(":memory:");

        if db_url.starts_with("sqlite://") && !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://");
            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let connect_options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout);
        // WAL 与 synchronous 需要在每个连接上生效，放进连接参数而不是单次 PRAGMA
        let connect_options = if in_memory {
            connect_options
        } else {
            connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        let pool_options = SqlitePoolOptions::new().acquire_timeout(options.acquire_timeout);
        // 内存库每个连接都是独立的数据库，只能保留一个常驻连接
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(options.max_connections)
        };
        let pool = pool_options.connect_with(connect_options).await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Db, DbOptions};
    use domain::commands::{NewArticle, NewUser};
    use domain::{Article, Role, User};

    pub async fn memory_db() -> Db {
        Db::new("sqlite::memory:").await.unwrap()
    }

    /// A WAL database file with a real connection pool, for tests that need
    /// writers on separate connections. Keep the `TempDir` alive while using it.
    pub async fn file_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("moderation.db").display());
        let options = DbOptions {
            max_connections: 8,
            ..Default::default()
        };
        let db = Db::connect(&url, &options).await.unwrap();
        (dir, db)
    }

    pub async fn seed_user(db: &Db, id: &str, role: Role) -> User {
        db.insert_user(&NewUser {
            id: id.into(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            role,
        })
        .await
        .unwrap()
        .unwrap()
    }

    pub async fn seed_article(db: &Db, external_id: &str, author_id: &str) -> Article {
        db.insert_article(&NewArticle {
            external_id: external_id.into(),
            title: format!("Article {}", external_id),
            url: format!("https://news.example.com/{}", external_id),
            author_id: author_id.into(),
        })
        .await
        .unwrap()
        .unwrap()
    }
}
