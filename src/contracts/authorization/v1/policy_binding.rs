use crate::contracts::authorization::v1::role_binding::{RoleBinding, RoleRef};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespaced set of role bindings. The policy reference may point at another
/// namespace's policy or, with no namespace, at the cluster policy.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "authorization.openshift.io",
    version = "v1",
    kind = "PolicyBinding",
    plural = "policybindings",
    singular = "policybinding",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBindingSpec {
    #[serde(default)]
    pub last_modified: Option<String>,
    pub policy_ref: RoleRef,
    #[serde(default)]
    pub role_bindings: BTreeMap<String, RoleBinding>,
}

impl PolicyBinding {
    pub fn role_binding(&self, name: &str) -> Option<&RoleBinding> {
        self.spec.role_bindings.get(name)
    }

    pub fn binds_cluster_policy(&self) -> bool {
        self.spec.policy_ref.namespace.as_deref().unwrap_or_default().is_empty()
    }
}
