use log::info;
use serde::{Deserialize, Serialize};

/// A menu entry of the signed-in user, as reported by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserMenu {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub partial_selected: bool,
    #[serde(default)]
    pub is_authorized: bool,
    #[serde(default)]
    pub children: Vec<UserMenu>,
}

// Menu names as the backend stores them, with the console route and icon.
const ROUTES: &[(&str, &str, &str)] = &[
    ("仪表板", "/dashboard", "home"),
    ("用户管理", "/accounts", "users"),
    ("用户设置", "/accounts", "users"),
    ("角色管理", "/roles", "user-check"),
    ("角色设置", "/roles", "user-check"),
    ("组织管理", "/accounts", "building"),
    ("菜单管理", "/menus", "menu"),
    ("用户操作日志", "/operation-logs", "file-text"),
    ("系统设置", "/settings", "settings"),
    ("权限管理", "/permissions", "shield"),
];

pub fn route_for(name: &str) -> (&'static str, &'static str) {
    ROUTES
        .iter()
        .find(|(menu, _, _)| *menu == name)
        .map(|(_, path, icon)| (*path, *icon))
        .unwrap_or(("#", "menu"))
}

pub fn is_admin(name: &str, role_name: Option<&str>) -> bool {
    name == "admin" || role_name == Some("admin")
}

/// The menus shown in the sidebar.
///
/// Unauthorized entries are hidden unless the user is an administrator, and
/// an administrator who ends up with nothing gets [`default_menus`].
pub fn visible_menus(menus: &[UserMenu], admin: bool) -> Vec<UserMenu> {
    let visible: Vec<UserMenu> = menus
        .iter()
        .filter_map(|menu| visible_menu(menu, admin))
        .collect();
    if visible.is_empty() && admin {
        info!("no menus granted, using the default administrator menus");
        return default_menus();
    }
    visible
}

fn visible_menu(menu: &UserMenu, admin: bool) -> Option<UserMenu> {
    if !admin && !menu.is_authorized {
        return None;
    }
    let (path, icon) = route_for(&menu.name);
    Some(UserMenu {
        id: menu.id,
        name: menu.name.clone(),
        path: Some(path.to_string()),
        icon: Some(icon.to_string()),
        selected: menu.selected,
        partial_selected: menu.partial_selected,
        is_authorized: menu.is_authorized,
        children: menu
            .children
            .iter()
            .filter_map(|child| visible_menu(child, admin))
            .collect(),
    })
}

fn default_menu(id: i64, name: &str, children: Vec<UserMenu>) -> UserMenu {
    let (path, icon) = route_for(name);
    UserMenu {
        id,
        name: name.to_string(),
        path: Some(path.to_string()),
        icon: Some(icon.to_string()),
        selected: false,
        partial_selected: false,
        is_authorized: true,
        children,
    }
}

pub fn default_menus() -> Vec<UserMenu> {
    vec![
        default_menu(999, "仪表板", vec![]),
        default_menu(
            998,
            "用户管理",
            vec![
                default_menu(995, "用户设置", vec![]),
                default_menu(994, "角色设置", vec![]),
                default_menu(993, "用户操作日志", vec![]),
            ],
        ),
        default_menu(996, "菜单管理", vec![]),
    ]
}
