use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Outcome of a microphone permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
}

/// Host platform permission negotiation
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current state, without prompting
    async fn check_microphone(&self) -> Result<Permission>;

    /// Prompt the user (where the host supports it)
    async fn request_microphone(&self) -> Result<Permission>;
}

/// Permission provider for hosts without a prompt: answers from configuration
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions(pub Permission);

#[async_trait::async_trait]
impl PermissionProvider for StaticPermissions {
    async fn check_microphone(&self) -> Result<Permission> {
        Ok(self.0)
    }

    async fn request_microphone(&self) -> Result<Permission> {
        Ok(self.0)
    }
}
