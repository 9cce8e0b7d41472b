//! Crisis screening for user utterances.
//!
//! [`CrisisDetector`] is a coarse tripwire: a case-insensitive substring
//! match against a versioned phrase list.  It accepts false negatives
//! (phrases not on the list) and false positives (quoted or hypothetical
//! use).  [`resources`] holds the directory an escalation notifier shows.

pub mod detector;
pub mod resources;

pub use detector::{CrisisDetector, CrisisSignal, PhraseList};
pub use resources::{crisis_resources, CrisisResource, EMERGENCY_GUIDANCE};
