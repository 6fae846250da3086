use crate::contracts::authorization::v1::role_binding::{RoleBinding, RoleRef};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cluster-wide set of role bindings pointing at a cluster policy.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "authorization.openshift.io",
    version = "v1",
    kind = "ClusterPolicyBinding",
    plural = "clusterpolicybindings",
    singular = "clusterpolicybinding"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPolicyBindingSpec {
    #[serde(default)]
    pub last_modified: Option<String>,
    pub policy_ref: RoleRef,
    #[serde(default)]
    pub role_bindings: BTreeMap<String, RoleBinding>,
}

impl ClusterPolicyBinding {
    pub fn role_binding(&self, name: &str) -> Option<&RoleBinding> {
        self.spec.role_bindings.get(name)
    }
}
