use serde::{Deserialize, Serialize};

/// A student team as seen by the engine.
///
/// Teams are created and destroyed by the external team-management
/// collaborator; the engine only reads them. The `subgroup` label groups
/// teams that share a lab section and drives the selector's diversity
/// preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub subgroup: String,
}

impl Team {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, subgroup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subgroup: subgroup.into(),
        }
    }
}
