use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundDetails {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: Option<String>,
}

impl NotFoundDetails {
    pub fn new(kind: ResourceKind, name: &str, namespace: Option<&str>) -> Self {
        NotFoundDetails {
            kind,
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }
}

impl Display for NotFoundDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(
                f,
                "{} '{}' not found in namespace '{}'",
                self.kind, self.name, namespace
            ),
            None => write!(f, "{} '{}' not found", self.kind, self.name),
        }
    }
}
