use crate::contracts::authorization::v1::policy_rule::Role;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespaced set of roles, keyed by role name.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "authorization.openshift.io",
    version = "v1",
    kind = "Policy",
    plural = "policies",
    singular = "policy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
}

impl Policy {
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.spec.roles.get(name)
    }
}
