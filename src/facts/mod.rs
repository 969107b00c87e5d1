pub mod classify;
pub mod engine;
pub mod format;
pub mod store;
pub mod term;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use classify::{AuthorKind, Classifier, Intent};
pub use engine::{Acknowledger, FactEngine, FixedAck, RandomAcks, Utterance};
pub use format::FactFormatter;
pub use store::{FactCollection, FactStore, JsonFileCollection, MemoryCollection, StoreError};
pub use term::MatchKey;

/// A stored term → definition record.
///
/// Field names on the wire match the documents written by earlier deployments
/// (`fact`, `set_by`, `set_date`), so existing exports load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub term: String,
    #[serde(rename = "fact")]
    pub definition: String,
    #[serde(
        rename = "set_by",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    #[serde(
        rename = "set_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<SetDate>,
}

impl Fact {
    /// An authored fact stamped at `at`.
    pub fn authored(
        term: impl Into<String>,
        definition: impl Into<String>,
        author: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            author: Some(author.into()),
            created_at: Some(SetDate::from(at)),
        }
    }

    /// A reply-only fact: no author, no timestamp.
    pub fn unauthored(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
            author: None,
            created_at: None,
        }
    }
}

/// When a fact was set. Older records hold a zone-less date value, newer ones
/// hold epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetDate {
    Epoch(f64),
    Naive(NaiveDateTime),
}

impl From<DateTime<Utc>> for SetDate {
    fn from(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1e6;
        SetDate::Epoch(secs)
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn legacy_document_with_empty_author_reads_as_unauthored() {
        let fact: Fact =
            serde_json::from_str(r#"{"term":"foo","fact":"bar","set_by":"","set_date":1386000000}"#)
                .unwrap();
        assert_eq!(fact.author, None);
        assert_eq!(fact.created_at, Some(SetDate::Epoch(1386000000.0)));
    }

    #[test]
    fn naive_set_date_parses() {
        let fact: Fact = serde_json::from_str(
            r#"{"term":"foo","fact":"bar","set_by":"sduncan","set_date":"2013-12-02T10:30:00"}"#,
        )
        .unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2013, 12, 2)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(fact.created_at, Some(SetDate::Naive(expected)));
    }

    #[test]
    fn unauthored_fact_omits_metadata_fields() {
        let json = serde_json::to_value(Fact::unauthored("foo", "bar")).unwrap();
        assert_eq!(json, serde_json::json!({"term": "foo", "fact": "bar"}));
    }

    #[test]
    fn authored_fact_stores_epoch_seconds() {
        let at = Utc.with_ymd_and_hms(2013, 12, 2, 15, 30, 0).unwrap();
        let fact = Fact::authored("foo", "foo is bar", "sduncan", at);
        assert_eq!(fact.created_at, Some(SetDate::Epoch(1385998200.0)));
    }
}
