use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token linking one start request to its push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait CorrelationIdGenerator: Send + Sync {
    fn next(&self) -> CorrelationId;
}

/// Random v4 UUIDs in their hyphenated text form.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl CorrelationIdGenerator for UuidGenerator {
    fn next(&self) -> CorrelationId {
        CorrelationId(Uuid::new_v4().to_string())
    }
}
