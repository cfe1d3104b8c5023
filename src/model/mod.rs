use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod note;
mod task;

pub use note::{Note, NoteColor, Swatch, DEFAULT_NOTE_HEIGHT, DEFAULT_NOTE_WIDTH};
pub use task::Task;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// First eight hex digits, enough to address an entity from the CLI.
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }

            /// True when the simple (dash-free) form starts with `prefix`.
            pub fn matches_prefix(&self, prefix: &str) -> bool {
                let prefix = prefix.trim().replace('-', "").to_ascii_lowercase();
                !prefix.is_empty() && self.0.simple().to_string().starts_with(&prefix)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(TaskId);
entity_id!(NoteId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_their_own_prefix() {
        let id = TaskId::new();
        assert!(id.matches_prefix(&id.short()));
        assert!(id.matches_prefix(&id.short().to_uppercase()));
        assert!(!id.matches_prefix(""));
    }

    #[test]
    fn ids_parse_from_display() {
        let id = NoteId::new();
        let parsed: NoteId = id.to_string().parse().expect("parse id");
        assert_eq!(parsed, id);
    }
}
