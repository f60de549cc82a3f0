//! End-to-end convergence flow against an in-memory provider.
//!
//! Exercises the two-phase convergence contract across reconcile passes: the
//! pass that creates the security group defers the ingress rule, the next
//! pass appends it, and every pass after that is a no-op. The fake provider
//! records mutation counts so the idempotence claims are observable.

use std::sync::Mutex;

use async_trait::async_trait;

use trellis::identity::ClusterInfo;
use trellis::provider::{IpPermission, IpRange, NetworkApi, SecurityGroup, Subnet, Tag, Vpc};
use trellis::security_group::ensure_security_group;
use trellis::{Result, DEFAULT_IDENTIFIER_LENGTH};

/// In-memory provider state shared across reconcile passes
#[derive(Default)]
struct State {
    vpcs: Vec<Vpc>,
    subnets: Vec<Subnet>,
    groups: Vec<SecurityGroup>,
    creates: u32,
    authorizes: u32,
}

/// Fake network API that applies mutations to its own listings, so a second
/// reconcile pass observes the first pass's effects
struct FakeNetwork {
    state: Mutex<State>,
}

impl FakeNetwork {
    fn new(state: State) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn mutation_counts(&self) -> (u32, u32) {
        let state = self.state.lock().unwrap();
        (state.creates, state.authorizes)
    }

    fn group_permissions(&self, name: &str) -> Vec<IpPermission> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .iter()
            .find(|g| g.group_name == name)
            .map(|g| g.ip_permissions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NetworkApi for FakeNetwork {
    async fn describe_vpcs(&self) -> Result<Vec<Vpc>> {
        Ok(self.state.lock().unwrap().vpcs.clone())
    }

    async fn describe_subnets(&self) -> Result<Vec<Subnet>> {
        Ok(self.state.lock().unwrap().subnets.clone())
    }

    async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        Ok(self.state.lock().unwrap().groups.clone())
    }

    async fn create_security_group(
        &self,
        name: &str,
        _description: &str,
        vpc_id: &str,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.creates += 1;
        let group_id = format!("sg-{}", state.creates);
        state.groups.push(SecurityGroup {
            group_id: group_id.clone(),
            group_name: name.to_string(),
            vpc_id: vpc_id.to_string(),
            ip_permissions: vec![],
        });
        Ok(group_id)
    }

    async fn authorize_ingress(&self, group_id: &str, permissions: &[IpPermission]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.authorizes += 1;
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.group_id == group_id)
            .expect("authorize_ingress against unknown group");
        group.ip_permissions.extend_from_slice(permissions);
        Ok(())
    }
}

/// Cluster identity fixture with the naming scheme real implementations use
struct StaticCluster {
    id: String,
}

#[async_trait]
impl ClusterInfo for StaticCluster {
    async fn cluster_id(&self) -> Result<String> {
        Ok(self.id.clone())
    }

    async fn infra_name(&self, postfix: &str, max_len: usize) -> Result<String> {
        let mut name = format!("{}-{postfix}", self.id);
        name.truncate(max_len);
        Ok(name)
    }
}

fn cluster_vpc() -> Vpc {
    Vpc {
        vpc_id: "vpc-1".to_string(),
        cidr_block: "10.0.0.0/16".to_string(),
        tags: vec![Tag::new("Name", "bar-vpc")],
    }
}

fn desired_permission() -> IpPermission {
    IpPermission {
        ip_protocol: "-1".to_string(),
        from_port: None,
        to_port: None,
        ip_ranges: vec![IpRange {
            cidr_ip: "10.0.0.0/16".to_string(),
        }],
    }
}

#[tokio::test]
async fn converges_over_two_passes_then_stays_quiet() {
    let api = FakeNetwork::new(State {
        vpcs: vec![cluster_vpc()],
        ..Default::default()
    });
    let cluster = StaticCluster {
        id: "bar".to_string(),
    };

    // pass 1: the group is absent, so this pass creates it and defers the
    // ingress rule
    ensure_security_group(&api, &cluster).await.unwrap();
    assert_eq!(api.mutation_counts(), (1, 0));
    assert!(api.group_permissions("bar-security-group").is_empty());

    // pass 2: the group now exists without the rule, so this pass appends it
    ensure_security_group(&api, &cluster).await.unwrap();
    assert_eq!(api.mutation_counts(), (1, 1));
    assert_eq!(
        api.group_permissions("bar-security-group"),
        vec![desired_permission()]
    );

    // pass 3 and onward: converged, no further mutations
    ensure_security_group(&api, &cluster).await.unwrap();
    ensure_security_group(&api, &cluster).await.unwrap();
    assert_eq!(api.mutation_counts(), (1, 1));
}

#[tokio::test]
async fn leaves_foreign_permissions_intact() {
    let foreign = IpPermission {
        ip_protocol: "tcp".to_string(),
        from_port: Some(443),
        to_port: Some(443),
        ip_ranges: vec![IpRange {
            cidr_ip: "0.0.0.0/0".to_string(),
        }],
    };
    let api = FakeNetwork::new(State {
        vpcs: vec![cluster_vpc()],
        groups: vec![SecurityGroup {
            group_id: "sg-existing".to_string(),
            group_name: "bar-security-group".to_string(),
            vpc_id: "vpc-1".to_string(),
            ip_permissions: vec![foreign.clone()],
        }],
        ..Default::default()
    });
    let cluster = StaticCluster {
        id: "bar".to_string(),
    };

    ensure_security_group(&api, &cluster).await.unwrap();
    assert_eq!(api.mutation_counts(), (0, 1));
    assert_eq!(
        api.group_permissions("bar-security-group"),
        vec![foreign, desired_permission()]
    );

    // converged: the foreign rule did not confuse the membership test
    ensure_security_group(&api, &cluster).await.unwrap();
    assert_eq!(api.mutation_counts(), (0, 1));
}

#[tokio::test]
async fn truncates_derived_names_to_the_identifier_limit() {
    let long_id = "a".repeat(DEFAULT_IDENTIFIER_LENGTH);
    let cluster = StaticCluster {
        id: long_id.clone(),
    };

    let name = cluster
        .infra_name("security-group", DEFAULT_IDENTIFIER_LENGTH)
        .await
        .unwrap();
    assert_eq!(name.len(), DEFAULT_IDENTIFIER_LENGTH);
    assert!(name.starts_with(&long_id[..DEFAULT_IDENTIFIER_LENGTH - 1]));
}
