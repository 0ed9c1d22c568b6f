use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the `projects` table.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Project {
    /// UUID of the project
    pub id: Uuid,
    /// Name of the project
    pub name: String,
    /// Free-form description of the project
    pub description: Option<String>,
    /// Path of the project image inside the images bucket
    pub image_path: String,
    /// Path of the pattern PDF inside the patterns bucket, if any
    pub pattern_path: Option<String>,
    /// Namespaced tags (`category:value`) in the order they were entered
    #[serde(default)]
    pub tags: Vec<String>,
    /// Created at timestamp of the project
    pub created_at: Timestamp,
}

impl Project {
    pub fn has_pattern(&self) -> bool {
        self.pattern_path.is_some()
    }
}

/// Insert payload for a new row. `id` and `created_at` are assigned by the database.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub image_path: String,
    pub pattern_path: Option<String>,
    pub tags: Vec<String>,
}

/// Full set of editable columns written on update.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectChanges {
    pub name: String,
    pub description: Option<String>,
    pub image_path: String,
    pub pattern_path: Option<String>,
    pub tags: Vec<String>,
}
