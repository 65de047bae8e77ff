//! Capability-based identity collaborator.
//!
//! The original role checks (student/officer groups, superuser flags) map to
//! a capability set resolved once per request by an external identity
//! provider; the core only ever asks "does this identity carry capability X".

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A granted permission within the admissions workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Student,
    Officer,
    Admin,
}

/// Authenticated actor as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub capabilities: BTreeSet<Capability>,
}

impl Identity {
    pub fn new(id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Resolves an actor reference to a capability-bearing identity.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, actor: &str) -> Result<Identity, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("unknown actor {0}")]
    Unknown(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}
