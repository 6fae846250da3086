pub mod not_found_details;

use crate::services::backends::kubernetes::status::not_found_details::NotFoundDetails;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors returned by reads served from a local informer cache.
#[derive(Debug)]
pub enum Status {
    NotFound(NotFoundDetails),
    IndexNotFound(String),
}

impl Status {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Status::NotFound(_))
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NotFound(details) => write!(f, "{}", details),
            Status::IndexNotFound(name) => write!(f, "Index with name '{}' does not exist", name),
        }
    }
}

impl Error for Status {}
