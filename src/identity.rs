//! Cluster identity and resource naming capability.
//!
//! The logical cluster identifier lives outside this crate (in the embedding
//! platform's own metadata), as does the policy for formatting provider-safe
//! resource names. Both are consumed through [`ClusterInfo`] so convergence
//! operations can be tested against a mock and never reach for an ambient
//! client.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Trait abstracting cluster identity lookup and infra name derivation
///
/// Implementations typically read the platform's cluster metadata. Both
/// methods must be deterministic for a given cluster so that repeated
/// convergence passes resolve the same resources.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterInfo: Send + Sync {
    /// Resolve the logical cluster identifier
    ///
    /// Fails with [`crate::Error::Configuration`] when the identity cannot be
    /// determined.
    async fn cluster_id(&self) -> Result<String>;

    /// Derive a provider-safe resource name from the cluster identity and the
    /// given postfix, truncated to `max_len` characters
    ///
    /// The result is validated against provider length and charset limits by
    /// the implementation, not by callers.
    async fn infra_name(&self, postfix: &str, max_len: usize) -> Result<String>;
}
