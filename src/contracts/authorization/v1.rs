//! Authorization resources served by the `authorization.openshift.io/v1` API group.
//!
//! Cluster policies and cluster policy bindings are cluster-scoped, policies and
//! policy bindings live in a namespace.

pub mod cluster_policy;
pub mod cluster_policy_binding;
pub mod policy;
pub mod policy_binding;
pub mod policy_rule;
pub mod role_binding;
