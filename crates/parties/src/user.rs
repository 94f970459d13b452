use serde::{Deserialize, Serialize};

use stockfront_core::{DomainError, DomainResult, UserId};

/// A directory user (potential placer of orders).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub department: String,
}

impl User {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        department: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name"));
        }
        Ok(Self {
            id,
            name,
            department: department.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        let err = User::new(UserId::new(), "", "sales").unwrap_err();
        assert_eq!(err, DomainError::validation("name"));
    }
}
