
use kube::Resource;
use std::fmt::{Display, Formatter};

/// Identifies one remote resource type: the API group plus the plural resource name.
///
/// Derived from the static resource descriptor, so two values for the same Rust type
/// always compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKind {
    group: String,
    resource: String,
}

impl ResourceKind {
    pub fn new(group: &str, resource: &str) -> Self {
        ResourceKind {
            group: group.to_string(),
            resource: resource.to_string(),
        }
    }

    pub fn of<K>() -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        ResourceKind {
            group: K::group(&()).into_owned(),
            resource: K::plural(&()).into_owned(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}
