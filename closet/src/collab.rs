//! Contracts for the external collaborators the engine depends on.

use crate::model::{ClothingItem, Criteria, ImageRef, Outfit};
use async_trait::async_trait;
use std::fmt;

/// Identity of the signed-in account all data is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exposes the current user session, if any.
///
/// "No current user" is a precondition failure for every engine
/// operation, not a retryable error.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Result of classifying an item photo.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: String,
    pub color: String,
    pub style: String,
    pub tags: Vec<String>,
    pub refresh_cycle: u32,
}

impl Classification {
    /// Placeholder used when the classifier fails or returns an unusable
    /// result, so item creation is never blocked on it.
    pub fn manual_fallback() -> Self {
        Self {
            kind: "unknown".to_owned(),
            color: "unknown".to_owned(),
            style: "unknown".to_owned(),
            tags: vec!["manual-entry".to_owned()],
            refresh_cycle: 7,
        }
    }

    pub(crate) fn is_usable(&self) -> bool {
        !self.kind.trim().is_empty()
            && !self.color.trim().is_empty()
            && !self.style.trim().is_empty()
            && self.refresh_cycle >= 1
    }
}

/// The vision model classifying item photos.
///
/// Invoked once per new item; any internal consensus querying is the
/// collaborator's concern.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImageRef) -> anyhow::Result<Classification>;
}

/// The language model suggesting outfits from the available items.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn suggest(
        &self,
        available: &[ClothingItem],
        criteria: &Criteria,
    ) -> anyhow::Result<Vec<Outfit>>;
}
