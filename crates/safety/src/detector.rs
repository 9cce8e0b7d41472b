use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use sr_domain::config::SafetyConfig;

/// Version label of the built-in phrase list.
pub const BUILTIN_VERSION: &str = "v1";

const BUILTIN_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "hurt myself",
    "self harm",
    "suicidal",
    "can't go on",
    "no reason to live",
    "better off dead",
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phrase list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A versioned set of crisis phrases, stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseList {
    version: String,
    phrases: Vec<String>,
}

impl PhraseList {
    /// Build a list; blank phrases are dropped and duplicates collapsed.
    pub fn new(version: impl Into<String>, phrases: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for phrase in phrases {
            let p = normalize(phrase.as_ref());
            if !p.is_empty() && !normalized.contains(&p) {
                normalized.push(p);
            }
        }
        Self {
            version: version.into(),
            phrases: normalized,
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_VERSION, BUILTIN_PHRASES)
    }

    /// Resolve the list described by the `[safety]` config section.
    pub fn from_config(cfg: &SafetyConfig) -> Self {
        let (version, base): (String, Vec<String>) = if cfg.phrases.is_empty() {
            (
                cfg.phrase_list_version
                    .clone()
                    .unwrap_or_else(|| BUILTIN_VERSION.into()),
                BUILTIN_PHRASES.iter().map(|p| p.to_string()).collect(),
            )
        } else {
            (
                cfg.phrase_list_version
                    .clone()
                    .unwrap_or_else(|| "custom".into()),
                cfg.phrases.clone(),
            )
        };

        if !cfg.phrases.is_empty() && cfg.phrase_list_version.is_none() {
            tracing::warn!("custom crisis phrase list has no version label; using \"custom\"");
        }

        let version = if cfg.extra_phrases.is_empty() {
            version
        } else {
            format!("{version}+{}", cfg.extra_phrases.len())
        };

        let list = Self::new(version, base.iter().chain(&cfg.extra_phrases));
        tracing::info!(
            version = %list.version,
            phrases = list.phrases.len(),
            custom = !cfg.phrases.is_empty(),
            extra = cfg.extra_phrases.len(),
            "crisis phrase list loaded"
        );
        list
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detector
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of screening one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrisisSignal {
    pub source_message_id: String,
    pub matched: bool,
}

/// Pure, side-effect-free crisis screen.  Cheap to clone and safe to call
/// redundantly.
#[derive(Debug, Clone)]
pub struct CrisisDetector {
    list: PhraseList,
}

impl CrisisDetector {
    pub fn new(list: PhraseList) -> Self {
        Self { list }
    }

    pub fn phrase_list(&self) -> &PhraseList {
        &self.list
    }

    /// `true` when any phrase occurs in `text`, ignoring case.
    pub fn evaluate(&self, text: &str) -> bool {
        let text = normalize(text);
        self.list.phrases.iter().any(|p| text.contains(p.as_str()))
    }

    /// Every phrase that occurs in `text`, in list order.
    pub fn matched_phrases(&self, text: &str) -> Vec<&str> {
        let text = normalize(text);
        self.list
            .phrases
            .iter()
            .filter(|p| text.contains(p.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Screen the utterance stored as `message_id`.
    pub fn signal(&self, message_id: &str, text: &str) -> CrisisSignal {
        CrisisSignal {
            source_message_id: message_id.to_owned(),
            matched: self.evaluate(text),
        }
    }
}

impl Default for CrisisDetector {
    fn default() -> Self {
        Self::new(PhraseList::builtin())
    }
}

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Lowercase, map typographic apostrophes to `'`, collapse whitespace.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}', '`'], "'");
    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}
