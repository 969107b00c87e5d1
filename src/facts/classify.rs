//! Recognition grammar for chat lines.
//!
//! Plain lines are tried against, in order:
//! 1. `^(.*?) (is|are)( <reply>\s*)?(.+)$`: declare a fact
//! 2. `^(.*)\?$`: ask for a fact
//!
//! Lines addressed to the bot (`!cmd` or `<nick>: cmd`) whose first word is
//! `forget` or `replace` are commands and never reach the grammar.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use super::term::collapse_spaces;

static DECLARE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?) (is|are)( <reply>\s*)?(.+)$").unwrap());

static QUERY_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.*)\?$").unwrap());

const REPLY_MARKER: &str = "<reply>";
const WITH_MARKER: &str = "<with>";
const COMMAND_PREFIX: char = '!';

/// Subjects that never become facts when blacklisting is left at its default.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "who", "what", "where", "when", "why", "how", "and", "hmm", "huh", "no", "oh", "ok", "right",
    "well", "yes",
];

/// Who a declared fact is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorKind {
    /// The person who said it; the full phrasing is stored.
    Speaker,
    /// `<reply>` form: only the text after the marker is stored, unattributed.
    ReplyOnly,
}

/// What a line of chat asks the fact memory to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Declare {
        term: String,
        definition: String,
        author: AuthorKind,
    },
    Query {
        term: String,
    },
    Forget {
        term: String,
    },
    Replace {
        term: String,
        definition: String,
    },
    /// `replace` without a `<with>` separator.
    ReplaceMalformed,
    NoOp,
}

pub struct Classifier {
    blacklist: HashSet<String>,
    nickname: Option<String>,
    require_nickname: bool,
    nick_prefix: Option<Regex>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST.iter().map(|w| w.to_string()), None, false)
    }
}

impl Classifier {
    /// Build a classifier.
    ///
    /// `nickname` is the bot's own address-name. It enables `<nick>: forget foo`
    /// style commands and, with `require_nickname`, gates the declare/query grammar.
    pub fn new(
        blacklist: impl IntoIterator<Item = String>,
        nickname: Option<String>,
        require_nickname: bool,
    ) -> Self {
        let nickname = nickname.filter(|n| !n.is_empty());
        let nick_prefix = nickname.as_deref().and_then(|nick| {
            Regex::new(&format!(r"^{}\W*\s(.*)$", regex::escape(nick)))
                .map_err(|e| tracing::warn!(nick, "bad nickname pattern: {e}"))
                .ok()
        });
        Self {
            blacklist: blacklist.into_iter().collect(),
            nickname,
            require_nickname,
            nick_prefix,
        }
    }

    /// The bot's own address-name, if it has one.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn require_nickname(&self) -> bool {
        self.require_nickname
    }

    pub fn is_blacklisted(&self, subject: &str) -> bool {
        self.blacklist.contains(subject)
    }

    pub fn classify(&self, text: &str) -> Intent {
        let line = text.trim_end_matches(['\r', '\n']);

        if let Some((command, args)) = self.split_command(line) {
            match command {
                "forget" => {
                    return Intent::Forget {
                        term: args.join(" "),
                    };
                }
                "replace" => return replace_intent(&args),
                _ => {}
            }
        }

        if let Some(caps) = DECLARE_PATTERN.captures(line) {
            let subject = caps.get(1).map_or("", |m| m.as_str());
            let copula = caps.get(2).map_or("", |m| m.as_str());
            let marker = caps.get(3).map(|m| m.as_str());
            let remainder = caps.get(4).map_or("", |m| m.as_str());
            return self.declare_intent(subject, copula, marker, remainder);
        }

        if let Some(caps) = QUERY_PATTERN.captures(line) {
            let term = caps.get(1).map_or("", |m| m.as_str());
            return self.query_intent(term);
        }

        Intent::NoOp
    }

    fn declare_intent(
        &self,
        subject: &str,
        copula: &str,
        marker: Option<&str>,
        remainder: &str,
    ) -> Intent {
        let Some(subject) = self.strip_required_nick(subject) else {
            return Intent::NoOp;
        };

        // An empty subject could never be queried back.
        if subject.trim().is_empty() {
            return Intent::NoOp;
        }

        if self.is_blacklisted(subject) {
            debug!(subject, "ignoring blacklisted fact word");
            return Intent::NoOp;
        }

        if marker.is_some_and(|m| m.trim() == REPLY_MARKER) {
            return Intent::Declare {
                term: subject.to_string(),
                definition: collapse_spaces(remainder),
                author: AuthorKind::ReplyOnly,
            };
        }

        Intent::Declare {
            term: subject.to_string(),
            definition: collapse_spaces(&format!("{subject} {copula} {remainder}")),
            author: AuthorKind::Speaker,
        }
    }

    fn query_intent(&self, term: &str) -> Intent {
        let Some(term) = self.strip_required_nick(term) else {
            return Intent::NoOp;
        };
        let term = term.trim();
        if term.is_empty() {
            return Intent::NoOp;
        }
        Intent::Query {
            term: term.to_string(),
        }
    }

    /// In nickname-gated mode, the subject must start with the bot's name;
    /// returns what follows it. Outside that mode the subject passes through.
    fn strip_required_nick<'a>(&self, subject: &'a str) -> Option<&'a str> {
        if !self.require_nickname {
            return Some(subject);
        }
        let stripped = self
            .nick_prefix
            .as_ref()
            .and_then(|re| re.captures(subject))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        if stripped.is_none() {
            debug!(subject, "facts require the bot nick, ignoring");
        }
        stripped
    }

    /// Split an addressed line into its command word and arguments.
    fn split_command<'a>(&self, line: &'a str) -> Option<(&'a str, Vec<&'a str>)> {
        let rest = if let Some(rest) = line.strip_prefix(COMMAND_PREFIX) {
            rest
        } else {
            let caps = self.nick_prefix.as_ref()?.captures(line)?;
            caps.get(1)?.as_str()
        };

        let mut words = rest.split_whitespace();
        let command = words.next()?;
        Some((command, words.collect()))
    }
}

fn replace_intent(args: &[&str]) -> Intent {
    if !args.contains(&WITH_MARKER) {
        return Intent::ReplaceMalformed;
    }
    let joined = args.join(" ");
    match joined.split_once(&format!(" {WITH_MARKER} ")) {
        Some((term, definition)) => Intent::Replace {
            term: term.to_string(),
            definition: definition.to_string(),
        },
        None => Intent::ReplaceMalformed,
    }
}
