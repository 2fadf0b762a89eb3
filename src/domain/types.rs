//! Strongly typed identifiers shared by the domain and repository layers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeConstraintError {
    #[error("{kind} must be positive, got {value}")]
    NonPositiveId { kind: &'static str, value: i32 },
}

macro_rules! positive_id {
    ($name:ident, $kind:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i32", into = "i32")]
        pub struct $name(i32);

        impl $name {
            pub fn new(value: i32) -> Result<Self, TypeConstraintError> {
                if value <= 0 {
                    return Err(TypeConstraintError::NonPositiveId {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            pub fn get(self) -> i32 {
                self.0
            }
        }

        impl TryFrom<i32> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(ProjectId, "project id");
positive_id!(ResearcherId, "researcher id");
positive_id!(DocumentId, "document id");
positive_id!(MatchId, "match id");
