//! Pre-moderation of comment text against banned and suspect word lists.

use crate::models::CommentStatus;
use regex::{Regex, RegexBuilder};

/// Reason recorded on the audit row when the classifier sets a status on create.
pub const SYSTEM_REASON: &str = "Inappropriate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Contains a banned term; the comment is stored as REJECTED.
    Reject,
    /// Contains a suspect term; the comment is stored as FLAGGED for review.
    Flag,
    Pass,
}

impl Verdict {
    /// Status a new comment is created with, if the verdict overrides PENDING.
    pub fn initial_status(&self) -> Option<CommentStatus> {
        match self {
            Verdict::Reject => Some(CommentStatus::Rejected),
            Verdict::Flag => Some(CommentStatus::Flagged),
            Verdict::Pass => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    banned: Option<Regex>,
    suspect: Option<Regex>,
}

impl Classifier {
    pub fn new<S: AsRef<str>>(banned: &[S], suspect: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            banned: build_pattern(banned)?,
            suspect: build_pattern(suspect)?,
        })
    }

    pub fn classify(&self, text: &str) -> Verdict {
        if matches(&self.banned, text) {
            return Verdict::Reject;
        }
        if matches(&self.suspect, text) {
            return Verdict::Flag;
        }
        Verdict::Pass
    }
}

fn matches(pattern: &Option<Regex>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

// An empty alternation would match every string, so an empty list yields no pattern.
fn build_pattern<S: AsRef<str>>(words: &[S]) -> Result<Option<Regex>, regex::Error> {
    let alternatives: Vec<String> = words
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .map(Some)
}
