//! Core note type definitions.
//!
//! Defines [`NoteType`] (the six note categories), [`NoteStatus`]
//! (lifecycle state), [`Space`] (which part of the vault a file belongs
//! to, driving metabolic decay), and [`Note`] (a parsed note file).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The six note categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Idea,
    Decision,
    Learning,
    Insight,
    Blocker,
    Opportunity,
}

impl NoteType {
    /// All types in one-hot slot order.
    pub const ALL: [NoteType; 6] = [
        Self::Idea,
        Self::Decision,
        Self::Learning,
        Self::Insight,
        Self::Blocker,
        Self::Opportunity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Decision => "decision",
            Self::Learning => "learning",
            Self::Insight => "insight",
            Self::Blocker => "blocker",
            Self::Opportunity => "opportunity",
        }
    }

    /// Slot index in the type one-hot vector.
    pub fn slot(&self) -> usize {
        match self {
            Self::Idea => 0,
            Self::Decision => 1,
            Self::Learning => 2,
            Self::Insight => 3,
            Self::Blocker => 4,
            Self::Opportunity => 5,
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idea" => Ok(Self::Idea),
            "decision" => Ok(Self::Decision),
            "learning" => Ok(Self::Learning),
            "insight" => Ok(Self::Insight),
            "blocker" => Ok(Self::Blocker),
            "opportunity" => Ok(Self::Opportunity),
            _ => Err(format!("unknown note type: {s}")),
        }
    }
}

/// Lifecycle state of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Inbox,
    Active,
    Completed,
    Superseded,
    Archived,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Superseded => "superseded",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Self::Inbox),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "superseded" => Ok(Self::Superseded),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("unknown note status: {s}")),
        }
    }
}

/// Which part of the vault a file belongs to. Drives the metabolic decay
/// rate: identity files decay slowest, operational files fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Space {
    Identity,
    Notes,
    Ops,
}

impl Space {
    /// Classify by the file's parent directory name.
    pub fn from_dir_name(name: &str) -> Self {
        match name {
            "self" => Self::Identity,
            "ops" => Self::Ops,
            _ => Self::Notes,
        }
    }
}

/// A parsed note. Identified by its title — the file's base name, unique
/// within the corpus and case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// One sentence, at most 200 chars, no trailing period.
    pub description: Option<String>,
    /// Project tags this note belongs to.
    pub projects: Vec<String>,
    pub status: NoteStatus,
    pub created: NaiveDate,
    /// Always >= `created`. Read by the engine, written by the capture
    /// collaborator.
    pub last_accessed: NaiveDate,
    pub access_count: u32,
    /// Free text. `[[target title]]` tokens inside it are the outgoing edges.
    pub body: String,
    /// Distinct outgoing link targets in order of first appearance.
    pub links: Vec<String>,
    pub space: Space,
}

impl Note {
    /// A body-only note with header defaults, used when a file has no
    /// parseable metadata header.
    pub fn body_only(title: impl Into<String>, body: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            title: title.into(),
            note_type: NoteType::Idea,
            description: None,
            projects: Vec::new(),
            status: NoteStatus::Active,
            created: today,
            last_accessed: today,
            access_count: 0,
            body: body.into(),
            links: Vec::new(),
            space: Space::Notes,
        }
    }

    /// Lifetime in whole days as of `today`, never negative.
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.created).num_days().max(0)
    }
}
