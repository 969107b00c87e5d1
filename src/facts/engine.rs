use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::classify::{AuthorKind, Classifier, Intent};
use super::format::FactFormatter;
use super::store::{FactCollection, FactStore, JsonFileCollection, MemoryCollection, StoreError};
use crate::config::{FactbotConfig, StoreBackend};

/// Reply to a `replace` that is missing its `<with>` separator.
pub const NO_DEFINITION_REPLY: &str = "No definition supplied.";

/// Confirmation phrases used when none are configured.
pub const DEFAULT_ACKS: &[&str] = &[
    "roger",
    "10-4",
    "no problem",
    "will do",
    "you got it",
    "anything you say",
    "sure thing",
    "ok",
    "right-o",
    "consider it done",
];

/// Supplies the short confirmation said after a forget or replace.
pub trait Acknowledger: Send + Sync {
    fn ack(&self) -> String;
}

/// Picks uniformly from a fixed list of phrases.
pub struct RandomAcks {
    phrases: Vec<String>,
}

impl RandomAcks {
    /// Blank phrases are dropped. Falls back to [`DEFAULT_ACKS`] when none remain.
    pub fn new(phrases: Vec<String>) -> Self {
        let phrases: Vec<String> = phrases
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        let phrases = if phrases.is_empty() {
            DEFAULT_ACKS.iter().map(|s| s.to_string()).collect()
        } else {
            phrases
        };
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl Default for RandomAcks {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Acknowledger for RandomAcks {
    fn ack(&self) -> String {
        self.phrases
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACKS[0].to_string())
    }
}

/// Always answers with the same phrase.
pub struct FixedAck(pub String);

impl Acknowledger for FixedAck {
    fn ack(&self) -> String {
        self.0.clone()
    }
}

/// One inbound chat line, as delivered by a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub nick: String,
    #[serde(default)]
    pub channel: String,
    pub content: String,
}

impl Utterance {
    pub fn new(nick: impl Into<String>, channel: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            channel: channel.into(),
            content: content.into(),
        }
    }
}

/// Decides what each line means and carries it out against the store.
///
/// Holds no state of its own beyond its collaborators, so one engine is
/// shared across every connection.
pub struct FactEngine {
    classifier: Classifier,
    store: FactStore,
    formatter: FactFormatter,
    acks: Arc<dyn Acknowledger>,
}

impl FactEngine {
    pub fn new(
        classifier: Classifier,
        store: FactStore,
        formatter: FactFormatter,
        acks: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            classifier,
            store,
            formatter,
            acks,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    /// Handle one line of chat. `Ok(None)` means stay quiet.
    pub async fn handle(&self, utterance: &Utterance) -> Result<Option<String>, StoreError> {
        let intent = self.classifier.classify(&utterance.content);
        debug!(nick = %utterance.nick, channel = %utterance.channel, ?intent, "classified line");
        self.apply(intent, &utterance.nick).await
    }

    /// Carry out an already classified intent on behalf of `nick`.
    pub async fn apply(&self, intent: Intent, nick: &str) -> Result<Option<String>, StoreError> {
        match intent {
            Intent::Declare {
                term,
                definition,
                author,
            } => {
                let author = match author {
                    AuthorKind::Speaker => nick,
                    AuthorKind::ReplyOnly => "",
                };
                self.store.insert(&term, &definition, author).await?;
                Ok(None)
            }
            Intent::Query { term } => {
                let fact = self.store.find(&term).await?;
                Ok(fact.map(|f| self.formatter.render(&f)))
            }
            Intent::Forget { term } => Ok(Some(self.forget(&term).await?)),
            Intent::Replace { term, definition } => {
                Ok(Some(self.replace(&term, &definition, nick).await?))
            }
            Intent::ReplaceMalformed => Ok(Some(NO_DEFINITION_REPLY.to_string())),
            Intent::NoOp => Ok(None),
        }
    }

    /// Remove a fact. Acknowledges whether or not anything matched.
    pub async fn forget(&self, term: &str) -> Result<String, StoreError> {
        self.store.delete(term).await?;
        Ok(self.acks.ack())
    }

    /// Delete then re-add a fact under `author`.
    ///
    /// Not transactional: if the insert fails the old definition is already gone.
    pub async fn replace(&self, term: &str, definition: &str, author: &str) -> Result<String, StoreError> {
        self.store.delete(term).await?;
        self.store.insert(term, definition, author).await?;
        Ok(self.acks.ack())
    }
}

/// Build an engine, opening the configured store backend.
pub async fn from_config(config: &FactbotConfig) -> anyhow::Result<FactEngine> {
    let collection: Arc<dyn FactCollection> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryCollection::new()),
        StoreBackend::Json => {
            let path = config.store.resolved_path();
            let collection = JsonFileCollection::open(&path)
                .await
                .map_err(|e| anyhow::anyhow!("failed to open fact store {}: {e}", path.display()))?;
            Arc::new(collection)
        }
    };

    let facts = &config.facts;
    let classifier = Classifier::new(
        facts.word_blacklist.iter().cloned(),
        Some(config.gateway.nickname.clone()),
        facts.require_nickname,
    );

    Ok(FactEngine::new(
        classifier,
        FactStore::new(collection),
        FactFormatter::new(facts.tz()),
        Arc::new(RandomAcks::new(facts.acks.clone())),
    ))
}
