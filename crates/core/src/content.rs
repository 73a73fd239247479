//! Learning content attached to skills.

use serde::{Deserialize, Serialize};

/// Kind of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Recorded video
    Video,
    /// Audio only
    Audio,
    /// Written material
    Text,
    /// Hands-on practice
    Exercise,
}

impl ContentKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Text => "text",
            ContentKind::Exercise => "exercise",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(ContentKind::Video),
            "audio" => Ok(ContentKind::Audio),
            "text" => Ok(ContentKind::Text),
            "exercise" => Ok(ContentKind::Exercise),
            _ => Err(crate::ParseError {
                kind: "content kind",
                value: s.to_string(),
            }),
        }
    }
}

/// A raw content item from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LearningContent {
    /// Recorded lecture or demo
    Video {
        title: String,
        url: String,
        duration_minutes: u32,
    },
    /// Podcast or narrated lesson
    Audio {
        title: String,
        url: String,
        duration_minutes: u32,
    },
    /// Article, chapter or notes
    Text {
        title: String,
        body_ref: String,
    },
    /// Hands-on practice
    Exercise {
        title: String,
        instructions: String,
    },
}

impl LearningContent {
    /// The kind of this item.
    pub fn kind(&self) -> ContentKind {
        match self {
            LearningContent::Video { .. } => ContentKind::Video,
            LearningContent::Audio { .. } => ContentKind::Audio,
            LearningContent::Text { .. } => ContentKind::Text,
            LearningContent::Exercise { .. } => ContentKind::Exercise,
        }
    }

    /// The item's title.
    pub fn title(&self) -> &str {
        match self {
            LearningContent::Video { title, .. }
            | LearningContent::Audio { title, .. }
            | LearningContent::Text { title, .. }
            | LearningContent::Exercise { title, .. } => title,
        }
    }
}

/// How a content item was adapted to the requested difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "adaptation", rename_all = "lowercase")]
pub enum Adaptation {
    /// Beginner: extra guidance
    Scaffolded { hints: Vec<String> },
    /// Intermediate: unmodified
    Baseline,
    /// Advanced: extra work
    Challenge { challenges: Vec<String> },
}

/// A content item together with its adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptedContent {
    /// Original item
    pub content: LearningContent,

    /// Applied adaptation
    pub adaptation: Adaptation,
}
