pub mod envelope;
pub mod model;
pub mod selection;
pub mod sidebar;
pub mod tree;
mod misc;

use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use envelope::{adapt, adapt_page, list_field, AdaptError};
use model::{FlatEntry, Menu, MenuNode, Organization, Role};
use selection::PermissionSelector;
use tree::{build_tree, find_name, flatten_tree};

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("failed to access directory file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid directory json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Adapt(#[from] AdaptError),
}

/// Organizations, menus and roles as last fetched from the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Directory {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Directory {
    pub fn new() -> Self {
        Directory::default()
    }

    /// Reads a snapshot file.
    ///
    /// Each of `organizations`, `menus` and `roles` may hold the list itself,
    /// an object carrying the list under the same key, a `{total, data}` page,
    /// or any of these wrapped in a backend response envelope.
    pub fn load(filename: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let filename = filename.as_ref();
        let content = std::fs::read_to_string(filename)?;
        let directory = Self::from_value(serde_json::from_str(&content)?)?;
        info!(
            "loaded {}: {} organizations, {} menus, {} roles",
            filename.display(),
            directory.organizations.len(),
            directory.menus.len(),
            directory.roles.len()
        );
        Ok(directory)
    }

    pub fn from_value(raw: Value) -> Result<Self, DirectoryError> {
        let raw = adapt(raw)?;
        Ok(Directory {
            organizations: section(&raw, "organizations")?,
            menus: section(&raw, "menus")?,
            roles: section(&raw, "roles")?,
        })
    }

    pub fn into_file(&self, filename: impl AsRef<Path>) -> Result<(), DirectoryError> {
        let file = std::fs::File::create(filename)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn organization_tree(&self) -> Vec<Organization> {
        build_tree(&self.organizations)
    }

    /// Parent picker entries, without `exclude_id` and its descendants.
    pub fn organization_options(&self, exclude_id: Option<i64>) -> Vec<FlatEntry<Organization>> {
        flatten_tree(&self.organization_tree(), 0, exclude_id)
    }

    pub fn organization_name(&self, id: i64) -> Option<String> {
        find_name(&self.organization_tree(), id).map(str::to_string)
    }

    pub fn menu_tree(&self) -> Vec<Menu> {
        build_tree(&self.menus)
    }

    pub fn menu_nodes(&self) -> Vec<MenuNode> {
        self.menu_tree().iter().map(MenuNode::from).collect()
    }

    pub fn selector(&self) -> PermissionSelector {
        PermissionSelector::new(self.menu_nodes())
    }

    pub fn role(&self, id: i64) -> Option<&Role> {
        self.roles.iter().find(|role| role.id == id)
    }
}

fn section<T: DeserializeOwned>(raw: &Value, key: &str) -> Result<Vec<T>, DirectoryError> {
    let Some(value) = raw.get(key) else {
        return Ok(vec![]);
    };
    let data = adapt(value.clone())?;
    let mut items = list_field(&data, key);
    if items.is_empty() {
        items = adapt_page(data, 1, 0).items;
    }
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(DirectoryError::from))
        .collect()
}
