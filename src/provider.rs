//! Provider network data model and capability trait.
//!
//! This module defines the projection of the cloud provider's network layer
//! that convergence operations read and write: VPCs, subnets, and security
//! groups, each carrying loosely structured tag metadata. The [`NetworkApi`]
//! trait is the seam between this crate and the provider's real API client,
//! allowing tests to mock provider interactions while production code issues
//! real calls.
//!
//! Permission equality is structural: two [`IpPermission`] values are equal
//! only if every field matches exactly. There is no semantic CIDR
//! equivalence, so a rule for `10.0.0.0/8` never satisfies a desired rule
//! for `10.0.0.0/16`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// A key/value metadata entry attached to a provider resource
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An isolated virtual network with an address range
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Vpc {
    /// Provider-assigned VPC identifier
    pub vpc_id: String,
    /// Address range in CIDR notation
    pub cidr_block: String,
    /// Tag set (unordered)
    pub tags: Vec<Tag>,
}

/// A subnet belonging to a VPC
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Subnet {
    /// Provider-assigned subnet identifier
    pub subnet_id: String,
    /// Identifier of the owning VPC
    pub vpc_id: String,
    /// Tag set (unordered)
    pub tags: Vec<Tag>,
}

/// A source address range in an ingress permission
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IpRange {
    /// Source range in CIDR notation
    pub cidr_ip: String,
}

/// An ingress permission on a security group
///
/// `ip_protocol` follows the provider convention where `"-1"` means all
/// protocols; ports are absent for wildcard-protocol rules.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IpPermission {
    /// Protocol, or `"-1"` for all protocols
    pub ip_protocol: String,
    /// Start of the port range, if the protocol carries ports
    pub from_port: Option<i32>,
    /// End of the port range, if the protocol carries ports
    pub to_port: Option<i32>,
    /// Source address ranges (ordered)
    pub ip_ranges: Vec<IpRange>,
}

/// A named set of ingress permissions attached to a VPC
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SecurityGroup {
    /// Provider-assigned group identifier
    pub group_id: String,
    /// Group name, unique within the provider scope
    pub group_name: String,
    /// Identifier of the owning VPC
    pub vpc_id: String,
    /// Current ingress permissions
    pub ip_permissions: Vec<IpPermission>,
}

/// Trait abstracting the provider's network API
///
/// Each method maps to one synchronous request/response call against the
/// provider. List calls return full, unfiltered listings; all classification
/// happens in this crate from tag and name metadata. Implementations surface
/// provider failures as [`crate::Error::Provider`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// List all VPCs visible to the credentials in scope
    async fn describe_vpcs(&self) -> Result<Vec<Vpc>>;

    /// List all subnets visible to the credentials in scope
    async fn describe_subnets(&self) -> Result<Vec<Subnet>>;

    /// List all security groups visible to the credentials in scope
    async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>>;

    /// Create a security group in the given VPC, returning its identifier
    async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<String>;

    /// Add the given ingress permissions to a security group
    ///
    /// Appends only; existing permissions on the group are not affected.
    async fn authorize_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()>;
}
