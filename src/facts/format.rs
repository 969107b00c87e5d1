use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::info;

use super::term::collapse_spaces;
use super::{Fact, SetDate};

/// Zone fact timestamps are shown in when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::US::Eastern;

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M%p";

/// Turns a stored fact into the line the bot says back.
#[derive(Debug, Clone, Copy)]
pub struct FactFormatter {
    timezone: Tz,
}

impl Default for FactFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl FactFormatter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Render a fact with its attribution.
    ///
    /// - unauthored: `bar`
    /// - authored, no timestamp (legacy): `foo is bar (sduncan)`
    /// - authored: `foo is bar (sduncan on 12/02/2013 10:30AM)`
    pub fn render(&self, fact: &Fact) -> String {
        info!(term = %fact.term, "showing fact");
        let definition = collapse_spaces(&fact.definition);

        let author = match fact.author.as_deref() {
            Some(author) if !author.is_empty() => author,
            _ => return definition,
        };

        match fact.created_at {
            None => format!("{definition} ({author})"),
            Some(set_date) => format!(
                "{definition} ({author} on {})",
                self.format_set_date(set_date)
            ),
        }
    }

    /// Format a set date in the configured zone.
    pub fn format_set_date(&self, set_date: SetDate) -> String {
        match set_date {
            SetDate::Epoch(secs) => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                match self.timezone.timestamp_opt(whole as i64, nanos) {
                    LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => {
                        at.format(TIMESTAMP_FORMAT).to_string()
                    }
                    LocalResult::None => String::from("unknown date"),
                }
            }
            SetDate::Naive(naive) => self.format_naive(naive),
        }
    }

    // A naive value is wall time already in the configured zone. Binding it
    // can fail inside a DST gap; the wall time is still what was recorded.
    fn format_naive(&self, naive: NaiveDateTime) -> String {
        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => {
                at.format(TIMESTAMP_FORMAT).to_string()
            }
            LocalResult::None => naive.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
