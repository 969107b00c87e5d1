use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::Fact;
use super::term::{MatchKey, collapse_spaces};
use crate::fs_util::set_secure_file_permissions;

/// Failure in the storage collaborator. The engine never retries these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt fact store at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// The record collection facts live in.
///
/// Every lookup goes through a [`MatchKey`], so backends only need to support
/// case-insensitive whole-term matching.
#[async_trait]
pub trait FactCollection: Send + Sync {
    async fn find_one(&self, key: &MatchKey) -> Result<Option<Fact>, StoreError>;

    async fn count(&self, key: &MatchKey) -> Result<usize, StoreError>;

    async fn insert(&self, fact: Fact) -> Result<(), StoreError>;

    /// Remove every record matching `key`, returning how many went.
    async fn remove(&self, key: &MatchKey) -> Result<usize, StoreError>;

    /// Insert unless a record already matches the fact's term.
    ///
    /// The default is a count followed by an insert, which leaves a window
    /// where two writers can both see zero. Backends that can check and write
    /// under one lock override this.
    async fn insert_if_absent(&self, fact: Fact) -> Result<bool, StoreError> {
        let key = MatchKey::new(&fact.term);
        if self.count(&key).await? > 0 {
            return Ok(false);
        }
        self.insert(fact).await?;
        Ok(true)
    }
}

/// Source of "now" for fact timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Term-indexed fact operations on top of a [`FactCollection`].
pub struct FactStore {
    collection: Arc<dyn FactCollection>,
    clock: Clock,
}

impl FactStore {
    pub fn new(collection: Arc<dyn FactCollection>) -> Self {
        Self {
            collection,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used to stamp authored facts.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn find(&self, term: &str) -> Result<Option<Fact>, StoreError> {
        self.collection.find_one(&MatchKey::new(term)).await
    }

    pub async fn exists(&self, term: &str) -> Result<bool, StoreError> {
        Ok(self.collection.count(&MatchKey::new(term)).await? > 0)
    }

    /// Record a fact unless the term is already known. First write wins.
    ///
    /// An empty `author` stores the fact unauthored and without a timestamp.
    pub async fn insert(&self, term: &str, definition: &str, author: &str) -> Result<(), StoreError> {
        info!(term, definition, "adding new fact");
        let definition = collapse_spaces(definition);
        let fact = if author.is_empty() {
            Fact::unauthored(term, definition)
        } else {
            Fact::authored(term, definition, author, (self.clock)())
        };

        if !self.collection.insert_if_absent(fact).await? {
            debug!(term, "fact already exists, keeping the original");
        }
        Ok(())
    }

    pub async fn delete(&self, term: &str) -> Result<(), StoreError> {
        info!(term, "removing fact");
        let removed = self.collection.remove(&MatchKey::new(term)).await?;
        debug!(term, removed, "fact removal finished");
        Ok(())
    }
}

/// In-process collection. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCollection {
    facts: RwLock<Vec<Fact>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records, as they would come out of an export.
    pub fn with_facts(facts: Vec<Fact>) -> Self {
        Self {
            facts: RwLock::new(facts),
        }
    }

    pub async fn len(&self) -> usize {
        self.facts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.facts.read().await.is_empty()
    }
}

#[async_trait]
impl FactCollection for MemoryCollection {
    async fn find_one(&self, key: &MatchKey) -> Result<Option<Fact>, StoreError> {
        let facts = self.facts.read().await;
        Ok(facts.iter().find(|f| key.matches(&f.term)).cloned())
    }

    async fn count(&self, key: &MatchKey) -> Result<usize, StoreError> {
        let facts = self.facts.read().await;
        Ok(facts.iter().filter(|f| key.matches(&f.term)).count())
    }

    async fn insert(&self, fact: Fact) -> Result<(), StoreError> {
        self.facts.write().await.push(fact);
        Ok(())
    }

    async fn remove(&self, key: &MatchKey) -> Result<usize, StoreError> {
        let mut facts = self.facts.write().await;
        let before = facts.len();
        facts.retain(|f| !key.matches(&f.term));
        Ok(before - facts.len())
    }

    async fn insert_if_absent(&self, fact: Fact) -> Result<bool, StoreError> {
        let key = MatchKey::new(&fact.term);
        let mut facts = self.facts.write().await;
        if facts.iter().any(|f| key.matches(&f.term)) {
            return Ok(false);
        }
        facts.push(fact);
        Ok(true)
    }
}

/// Collection persisted as a JSON array of fact documents.
///
/// The whole file is read at open and rewritten after every mutation, via a
/// temp file and rename so a crash never leaves a half-written store.
pub struct JsonFileCollection {
    path: PathBuf,
    facts: RwLock<Vec<Fact>>,
}

impl JsonFileCollection {
    /// Open the store at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let facts = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => {
                serde_json::from_str::<Vec<Fact>>(&content).map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), facts = facts.len(), "opened fact store");

        Ok(Self {
            path,
            facts: RwLock::new(facts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, facts: &[Fact]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(facts)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        let perm_path = tmp.clone();
        tokio::task::spawn_blocking(move || set_secure_file_permissions(&perm_path))
            .await
            .map_err(std::io::Error::other)??;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl FactCollection for JsonFileCollection {
    async fn find_one(&self, key: &MatchKey) -> Result<Option<Fact>, StoreError> {
        let facts = self.facts.read().await;
        Ok(facts.iter().find(|f| key.matches(&f.term)).cloned())
    }

    async fn count(&self, key: &MatchKey) -> Result<usize, StoreError> {
        let facts = self.facts.read().await;
        Ok(facts.iter().filter(|f| key.matches(&f.term)).count())
    }

    async fn insert(&self, fact: Fact) -> Result<(), StoreError> {
        let mut facts = self.facts.write().await;
        facts.push(fact);
        if let Err(e) = self.persist(&facts).await {
            facts.pop();
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &MatchKey) -> Result<usize, StoreError> {
        let mut facts = self.facts.write().await;
        let (removed, kept): (Vec<Fact>, Vec<Fact>) =
            facts.drain(..).partition(|f| key.matches(&f.term));
        *facts = kept;
        if removed.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.persist(&facts).await {
            facts.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    async fn insert_if_absent(&self, fact: Fact) -> Result<bool, StoreError> {
        let key = MatchKey::new(&fact.term);
        let mut facts = self.facts.write().await;
        if facts.iter().any(|f| key.matches(&f.term)) {
            return Ok(false);
        }
        facts.push(fact);
        if let Err(e) = self.persist(&facts).await {
            facts.pop();
            return Err(e);
        }
        Ok(true)
    }
}
