//! Unique identifiers for Skillpath entities.
//!
//! Skills, students and courses are identified by the keys the persistence
//! collaborator hands out, so they wrap plain strings. Entities created by the
//! planner itself (pathways, activity records) get a fresh ULID.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a Skill
    SkillId
);

string_id!(
    /// Unique identifier for a Student
    StudentId
);

string_id!(
    /// Unique identifier for a Course
    CourseId
);

/// Unique identifier for a generated Pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathwayId(Ulid);

impl PathwayId {
    /// Generate a new PathwayId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for PathwayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PathwayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PathwayId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for an ActivityRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(Ulid);

impl ActivityId {
    /// Generate a new ActivityId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ids_serialize_transparently() {
        let id = SkillId::new("rust-basics");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rust-basics\"");

        let back: SkillId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_string_ids_order_lexically() {
        let mut ids = vec![SkillId::from("c"), SkillId::from("a"), SkillId::from("b")];
        ids.sort();
        assert_eq!(ids, vec![SkillId::from("a"), SkillId::from("b"), SkillId::from("c")]);
    }

    #[test]
    fn test_pathway_id_roundtrips_through_display() {
        let id = PathwayId::new();
        let parsed: PathwayId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
