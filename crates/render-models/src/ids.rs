//! Typed identifiers for the render domain.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of a generated public id (§3 Render: "~21 char, collision-resistant").
pub const PUBLIC_ID_LEN: usize = 21;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(CampaignId);
uuid_id!(RenderId);
uuid_id!(RenderJobId);

/// Short shareable public identifier used in viewer URLs (I4: globally unique, immutable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PublicId(pub String);

impl PublicId {
    /// Generate a fresh, collision-resistant public id.
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(PUBLIC_ID_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PublicId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_has_expected_length() {
        let id = PublicId::generate();
        assert_eq!(id.as_str().chars().count(), PUBLIC_ID_LEN);
    }

    #[test]
    fn public_ids_do_not_collide_in_a_small_sample() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(PublicId::generate().0));
        }
    }
}
