//! Unique identifiers for portdq entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a persisted inspection.
///
/// Backed by a ULID, so ids sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionId(Ulid);

impl InspectionId {
    /// Generate a new InspectionId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for InspectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InspectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for InspectionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspection_id_round_trips_through_string() {
        let id = InspectionId::new();
        let parsed: InspectionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_inspection_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<InspectionId>().is_err());
    }
}
