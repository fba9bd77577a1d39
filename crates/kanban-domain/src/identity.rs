use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};

/// Externally authenticated user identifier.
pub type UserId = String;

/// The authenticated identity an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    user_id: UserId,
}

impl Caller {
    /// Build a caller from the identity supplied by the transport. A missing
    /// or blank identity is rejected.
    pub fn from_identity(identity: Option<&str>) -> KanbanResult<Self> {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self {
                user_id: id.to_string(),
            }),
            _ => Err(KanbanError::Unauthorized(
                "missing caller identity".to_string(),
            )),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl std::fmt::Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_identity() {
        let caller = Caller::from_identity(Some(" alice ")).unwrap();
        assert_eq!(caller.user_id(), "alice");

        assert!(matches!(
            Caller::from_identity(None),
            Err(KanbanError::Unauthorized(_))
        ));
        assert!(matches!(
            Caller::from_identity(Some("   ")),
            Err(KanbanError::Unauthorized(_))
        ));
    }
}
