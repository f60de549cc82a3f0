//! Security group convergence.
//!
//! Drives a cluster's security group toward the desired state: a group named
//! after the cluster exists in the cluster's VPC and permits all traffic from
//! the VPC's address range. The operation is find-or-create against a
//! provider with no transactional guarantees, so it follows a two-phase
//! convergence contract: a pass that creates the group returns without
//! checking ingress, and the rule is converged on the next reconcile pass.
//! Repeated invocations are idempotent - the membership test for the ingress
//! rule is structural equality against the live permission set, never a
//! separate "already requested" flag.

use tracing::{info, instrument};

use crate::identity::ClusterInfo;
use crate::provider::{IpPermission, IpRange, NetworkApi, SecurityGroup};
use crate::vpc;
use crate::{Result, DEFAULT_IDENTIFIER_LENGTH};

/// Postfix appended to the cluster identity when deriving the group name
pub const SECURITY_GROUP_POSTFIX: &str = "security-group";

/// Ensure the cluster's security group exists and permits VPC-internal traffic
///
/// One convergence pass:
/// 1. derive the group name from the cluster identity
/// 2. resolve the cluster VPC and its CIDR block
/// 3. look the group up by exact name (first match wins)
/// 4. absent: create it and return - ingress is converged on the next pass
/// 5. present: append the all-protocols-from-VPC-CIDR permission unless a
///    structurally identical one already exists
///
/// Existing permissions are never removed or altered. Concurrent callers may
/// both observe "absent" and both create; callers needing exclusivity must
/// serialize externally.
#[instrument(skip_all)]
pub async fn ensure_security_group(api: &dyn NetworkApi, cluster: &dyn ClusterInfo) -> Result<()> {
    info!("setting cluster security group");

    let cluster_id = cluster
        .cluster_id()
        .await
        .map_err(|e| e.context("getting cluster id"))?;

    let group_name = cluster
        .infra_name(SECURITY_GROUP_POSTFIX, DEFAULT_IDENTIFIER_LENGTH)
        .await
        .map_err(|e| e.context("building security group name"))?;

    let (vpc_id, cidr) = vpc::cluster_cidr(api, &cluster_id)
        .await
        .map_err(|e| e.context("finding cidr block"))?;

    let Some(group) = find_security_group(api, &group_name).await? else {
        // the new group starts with no permissions that need removal; the
        // ingress rule is appended on the next reconcile pass
        info!(cluster = %cluster_id, group = %group_name, "creating security group");
        api.create_security_group(
            &group_name,
            &format!("security group for cluster {cluster_id}"),
            &vpc_id,
        )
        .await
        .map_err(|e| e.context("creating security group"))?;
        return Ok(());
    };

    let desired = vpc_ingress_permission(&cidr);
    if group.ip_permissions.iter().any(|perm| *perm == desired) {
        info!(group = %group.group_id, "ingress permissions already converged");
        return Ok(());
    }

    info!(group = %group.group_id, cidr = %cidr, "authorizing vpc ingress");
    api.authorize_ingress(&group.group_id, &[desired])
        .await
        .map_err(|e| e.context("authorizing security group ingress"))?;

    Ok(())
}

/// The desired ingress rule: all protocols, source = the VPC's CIDR block
fn vpc_ingress_permission(cidr: &str) -> IpPermission {
    IpPermission {
        ip_protocol: "-1".to_string(),
        from_port: None,
        to_port: None,
        ip_ranges: vec![IpRange {
            cidr_ip: cidr.to_string(),
        }],
    }
}

/// Look up a security group by exact name over the full listing
///
/// First match wins; name uniqueness within the provider scope is assumed,
/// not verified.
async fn find_security_group(api: &dyn NetworkApi, name: &str) -> Result<Option<SecurityGroup>> {
    let groups = api
        .describe_security_groups()
        .await
        .map_err(|e| e.context("listing security groups"))?;

    Ok(groups.into_iter().find(|group| group.group_name == name))
}
