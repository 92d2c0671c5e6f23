mod articles;
mod audit;
mod comments;
mod thread;
mod users;

use anyhow::Context;
use domain::{Classifier, ModerationError, ModerationResult};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storage::Db;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Terms that reject a new comment outright.
    #[serde(default)]
    pub banned_words: Vec<String>,
    /// Terms that put a new comment in the FLAGGED queue.
    #[serde(default)]
    pub suspect_words: Vec<String>,
    /// Upper bound for every datastore call made on behalf of one operation.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            banned_words: Vec::new(),
            suspect_words: Vec::new(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

/// Entry point for every moderation operation. Cheap to clone; clones share
/// the pool and the compiled classifier.
#[derive(Clone)]
pub struct Moderator {
    db: Db,
    classifier: Arc<Classifier>,
    op_timeout: Duration,
}

impl Moderator {
    pub fn new(db: Db, config: &ModerationConfig) -> anyhow::Result<Self> {
        let classifier = Classifier::new(
            config.banned_words.as_slice(),
            config.suspect_words.as_slice(),
        )
        .context("Failed to compile moderation word lists")?;
        info!(
            "Classifier ready: {} banned, {} suspect terms",
            config.banned_words.len(),
            config.suspect_words.len()
        );
        Ok(Self {
            db,
            classifier: Arc::new(classifier),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        })
    }

    /// Runs one datastore call under the operation timeout. Failures are
    /// logged here with the operation name and surface as `Internal`; an open
    /// transaction inside `fut` is dropped, and so rolled back, on timeout.
    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> ModerationResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(op, "Datastore operation failed: {:?}", e);
                Err(ModerationError::Internal(op))
            }
            Err(_) => {
                error!(
                    op,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Datastore operation timed out"
                );
                Err(ModerationError::Internal(op))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{ModerationConfig, Moderator};
    use domain::commands::{NewArticle, NewUser};
    use domain::{Article, Role};
    use storage::{Db, DbOptions};

    pub async fn moderator() -> Moderator {
        let db = Db::new("sqlite::memory:").await.unwrap();
        let config = ModerationConfig {
            banned_words: vec!["scam".into(), "buy followers".into()],
            suspect_words: vec!["idiot".into(), "stupid".into()],
            ..Default::default()
        };
        Moderator::new(db, &config).unwrap()
    }

    /// Same configuration as `moderator()` but backed by a WAL file with a
    /// multi-connection pool, so concurrent calls really race.
    pub async fn file_moderator() -> (tempfile::TempDir, Moderator) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("moderation.db").display());
        let options = DbOptions {
            max_connections: 8,
            ..Default::default()
        };
        let db = Db::connect(&url, &options).await.unwrap();
        let config = ModerationConfig {
            banned_words: vec!["scam".into()],
            ..Default::default()
        };
        (dir, Moderator::new(db, &config).unwrap())
    }

    pub async fn seed_user(m: &Moderator, id: &str, role: Role) {
        m.create_user(NewUser {
            id: id.into(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            role,
        })
        .await
        .unwrap();
    }

    pub async fn seed_article(m: &Moderator, external_id: &str, author_id: &str) -> Article {
        m.create_article(NewArticle {
            external_id: external_id.into(),
            title: format!("Article {}", external_id),
            url: format!("https://news.example.com/{}", external_id),
            author_id: author_id.into(),
        })
        .await
        .unwrap()
    }
}
