use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node of the category forest; `parent == None` marks a root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub parent: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub parent: Option<Uuid>,
}

/// Partial category update
///
/// `parent` distinguishes "leave as is" (`None`) from "make root" (`Some(None)`) and
/// "move under" (`Some(Some(id))`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<Uuid>>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent.is_none()
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// A category with its children materialised, as returned by the tree operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub id: Uuid,
    pub name: String,
    pub parent: Option<Uuid>,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn leaf(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            parent: category.parent,
            children: Vec::new(),
        }
    }

    /// Number of levels below this node (0 for a leaf)
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}
