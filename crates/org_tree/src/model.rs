use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tree::Hierarchical;

/// An organization record as delivered by the backend.
///
/// A missing `parent_id` marks a root. Fields the console does not know about
/// are kept in `extra` and written back out unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Organization>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    pub fn new(id: i64, name: &str, parent_id: Option<i64>) -> Self {
        Organization {
            id,
            name: name.to_string(),
            parent_id,
            parent_name: None,
            children: vec![],
            extra: Map::new(),
        }
    }
}

impl Hierarchical for Organization {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn without_children(&self) -> Self {
        Organization {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            parent_name: self.parent_name.clone(),
            children: vec![],
            extra: self.extra.clone(),
        }
    }
}

/// A menu record as delivered by the backend's menu list.
///
/// The backend uses `0` for "no parent", so both `null` and `0` mark a root.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Menu>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Menu {
    pub fn new(id: i64, name: &str, parent_id: Option<i64>) -> Self {
        Menu {
            id,
            name: name.to_string(),
            parent_id,
            path: None,
            icon: None,
            sort: None,
            children: vec![],
            extra: Map::new(),
        }
    }
}

impl Hierarchical for Menu {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id.filter(|&parent| parent != 0)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn without_children(&self) -> Self {
        Menu {
            id: self.id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            path: self.path.clone(),
            icon: self.icon.clone(),
            sort: self.sort,
            children: vec![],
            extra: self.extra.clone(),
        }
    }
}

/// The menu shape rendered by the role permission editor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    pub menu_id: i64,
    pub menu_name: String,
    #[serde(default)]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(menu_id: i64, menu_name: &str, children: Vec<MenuNode>) -> Self {
        MenuNode {
            menu_id,
            menu_name: menu_name.to_string(),
            children,
        }
    }

    pub fn to_ref(&self) -> MenuRef {
        MenuRef {
            menu_id: self.menu_id,
            menu_name: self.menu_name.clone(),
        }
    }
}

impl From<&Menu> for MenuNode {
    fn from(menu: &Menu) -> Self {
        MenuNode {
            menu_id: menu.id,
            menu_name: menu.name.clone(),
            children: menu.children.iter().map(MenuNode::from).collect(),
        }
    }
}

impl Hierarchical for MenuNode {
    fn id(&self) -> i64 {
        self.menu_id
    }

    fn parent_id(&self) -> Option<i64> {
        None
    }

    fn name(&self) -> &str {
        &self.menu_name
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    fn without_children(&self) -> Self {
        MenuNode::new(self.menu_id, &self.menu_name, vec![])
    }
}

/// A granted menu as stored in a role's `menus` list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MenuRef {
    pub menu_id: i64,
    #[serde(default)]
    pub menu_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "deleteable_by_default")]
    pub is_deleteable: bool,
    #[serde(default)]
    pub menus: Vec<MenuRef>,
}

fn deleteable_by_default() -> bool {
    true
}

/// A node placed in a linear listing, `level` steps below the listing's roots.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FlatEntry<T> {
    pub level: usize,
    #[serde(flatten)]
    pub node: T,
}
