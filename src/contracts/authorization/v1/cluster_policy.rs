use crate::contracts::authorization::v1::policy_rule::Role;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster-wide set of roles, keyed by role name.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "authorization.openshift.io",
    version = "v1",
    kind = "ClusterPolicy",
    plural = "clusterpolicies",
    singular = "clusterpolicy"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPolicySpec {
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
}

impl ClusterPolicy {
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.spec.roles.get(name)
    }
}
