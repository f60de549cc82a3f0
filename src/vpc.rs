//! Cluster VPC and subnet discovery.
//!
//! The provider offers no structural link between a cluster and its VPC, so
//! discovery is tag-driven: the cluster's VPC is the one carrying a tag whose
//! value is `"<cluster-id>-vpc"`. This module centralizes that scan so every
//! consumer shares one selection policy, and layers the subnet projections
//! (associated, all ids, private ids) on top of it. All operations are
//! read-only.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::provider::{NetworkApi, Subnet, Vpc};
use crate::retry::{retry_until_ready, PollConfig};
use crate::{Error, Result};

/// Classifies a subnet as private: any tag value containing the word
/// `private`, matched case-sensitively on word boundaries.
static PRIVATE_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w*private\w*\b").expect("pattern compiles"));

/// Tie-break policy when more than one VPC carries the cluster tag value.
///
/// A provider returning two VPCs with colliding tag values is a degenerate
/// deployment, but the scan must still be total. [`MatchPolicy::LastWins`] is
/// the default; callers that consider ambiguity an error can opt into
/// [`MatchPolicy::RejectAmbiguous`] via [`find_cluster_vpc_with_policy`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The last matching VPC in listing order wins
    #[default]
    LastWins,
    /// The first matching VPC in listing order wins
    FirstWins,
    /// More than one matching VPC fails the lookup
    RejectAmbiguous,
}

/// Find the cluster's VPC using the default tie-break policy
///
/// Lists all VPCs and selects the one whose tag set contains a tag with the
/// value `"<cluster_id>-vpc"`. Fails with [`Error::NotFound`] when no VPC
/// matches. The VPC listing is assumed consistent by the time this runs and
/// is not polled.
pub async fn find_cluster_vpc(api: &dyn NetworkApi, cluster_id: &str) -> Result<Vpc> {
    find_cluster_vpc_with_policy(api, cluster_id, MatchPolicy::default()).await
}

/// Find the cluster's VPC with an explicit tie-break policy
pub async fn find_cluster_vpc_with_policy(
    api: &dyn NetworkApi,
    cluster_id: &str,
    policy: MatchPolicy,
) -> Result<Vpc> {
    debug!(cluster = %cluster_id, "finding cluster vpc");

    let vpcs = api
        .describe_vpcs()
        .await
        .map_err(|e| e.context("listing vpcs"))?;

    let wanted = format!("{cluster_id}-vpc");
    let mut matches: Vec<Vpc> = vpcs
        .into_iter()
        .filter(|vpc| vpc.tags.iter().any(|tag| tag.value == wanted))
        .collect();

    match (matches.len(), policy) {
        (0, _) => Err(Error::not_found(format!("no vpc tagged {wanted}"))),
        (1, _) => Ok(matches.remove(0)),
        (n, MatchPolicy::RejectAmbiguous) => Err(Error::not_found(format!(
            "expected exactly one vpc tagged {wanted}, found {n}"
        ))),
        (_, MatchPolicy::FirstWins) => Ok(matches.remove(0)),
        (n, MatchPolicy::LastWins) => Ok(matches.swap_remove(n - 1)),
    }
}

/// List the subnets associated with the cluster's VPC
///
/// The subnet listing is polled through [`retry_until_ready`] so
/// freshly-issued credentials have time to propagate. Fails with
/// [`Error::NotFound`] when the cluster VPC cannot be found or owns no
/// subnets.
pub async fn cluster_subnets(api: &dyn NetworkApi, cluster_id: &str) -> Result<Vec<Subnet>> {
    info!(cluster = %cluster_id, "gathering cluster vpc and subnet information");

    let subnets = retry_until_ready(&PollConfig::default(), "describe_subnets", || {
        api.describe_subnets()
    })
    .await
    .map_err(|e| e.context("listing subnets"))?;

    let vpc = find_cluster_vpc(api, cluster_id)
        .await
        .map_err(|e| e.context("finding cluster vpc"))?;

    let associated: Vec<Subnet> = subnets
        .into_iter()
        .filter(|subnet| subnet.vpc_id == vpc.vpc_id)
        .collect();

    if associated.is_empty() {
        return Err(Error::not_found(format!(
            "no subnets associated with cluster vpc {}",
            vpc.vpc_id
        )));
    }

    Ok(associated)
}

/// List the identifiers of all subnets associated with the cluster's VPC
pub async fn subnet_ids(api: &dyn NetworkApi, cluster_id: &str) -> Result<Vec<String>> {
    info!(cluster = %cluster_id, "gathering all cluster subnet ids");

    let subnets = cluster_subnets(api, cluster_id)
        .await
        .map_err(|e| e.context("gathering cluster subnets"))?;

    Ok(subnets.into_iter().map(|s| s.subnet_id).collect())
}

/// List the identifiers of the cluster's private subnets
///
/// A subnet is private when any of its tag values matches the word-boundary
/// pattern `private`. Fails with [`Error::NotFound`] when no associated
/// subnet is private.
pub async fn private_subnet_ids(api: &dyn NetworkApi, cluster_id: &str) -> Result<Vec<String>> {
    info!(cluster = %cluster_id, "gathering private cluster subnets");

    let subnets = cluster_subnets(api, cluster_id)
        .await
        .map_err(|e| e.context("gathering cluster subnets"))?;

    let ids: Vec<String> = subnets
        .into_iter()
        .filter(|subnet| {
            subnet
                .tags
                .iter()
                .any(|tag| PRIVATE_TAG_PATTERN.is_match(&tag.value))
        })
        .map(|s| s.subnet_id)
        .collect();

    if ids.is_empty() {
        return Err(Error::not_found(format!(
            "no private subnets associated with cluster {cluster_id}"
        )));
    }

    Ok(ids)
}

/// Return the cluster VPC's identifier and CIDR block
pub async fn cluster_cidr(api: &dyn NetworkApi, cluster_id: &str) -> Result<(String, String)> {
    info!(cluster = %cluster_id, "gathering cidr block for cluster");

    let vpc = find_cluster_vpc(api, cluster_id)
        .await
        .map_err(|e| e.context("finding cluster vpc"))?;

    Ok((vpc.vpc_id, vpc.cidr_block))
}
