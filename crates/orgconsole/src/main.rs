use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use clap::{Arg, Command};
use http_types::headers::HeaderValue;
use lazy_static::lazy_static;
use log::{error, info, warn};
use org_tree::envelope::Envelope;
use org_tree::model::{FlatEntry, MenuNode, Organization};
use org_tree::selection::{CheckState, MenuSelection, PermissionSelector};
use org_tree::sidebar::{is_admin, visible_menus, UserMenu};
use org_tree::tree::{count_nodes, option_label};
use org_tree::{Directory, DirectoryError};
use serde::{Deserialize, Serialize};

use tide::security::{CorsMiddleware, Origin};
use tide::{Request, StatusCode};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9000";
const UNKNOWN_ORGANIZATION: &str = "未知组织";

struct GlobalSingleton {
    directory: Directory,
}

lazy_static! {
    static ref CONTEXT: Mutex<GlobalSingleton> = Mutex::new(GlobalSingleton {
        directory: Directory::new(),
    });
}

fn context() -> MutexGuard<'static, GlobalSingleton> {
    CONTEXT.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Deserialize)]
struct LoadDirectoryReq {
    file: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationOptionsReq {
    #[serde(default)]
    exclude_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ToggleMenuReq {
    #[serde(default)]
    menus: MenuSelection,
    menu_id: i64,
}

#[derive(Debug, Deserialize)]
struct RepairMenusReq {
    #[serde(default)]
    menus: MenuSelection,
}

#[derive(Debug, Deserialize)]
struct SidebarReq {
    name: String,
    #[serde(default)]
    role_name: Option<String>,
    #[serde(default)]
    menus: Vec<UserMenu>,
}

#[derive(Debug, Serialize)]
struct OrganizationOption {
    label: String,
    #[serde(flatten)]
    entry: FlatEntry<Organization>,
}

/// A role's menus together with the checkbox state of every menu in the tree.
#[derive(Debug, Serialize)]
struct MenuSelectionResp {
    menus: MenuSelection,
    states: BTreeMap<i64, CheckState>,
}

impl MenuSelectionResp {
    fn new(selector: &PermissionSelector, menus: MenuSelection) -> Self {
        let mut states = BTreeMap::new();
        collect_states(selector, &menus, selector.tree(), &mut states);
        MenuSelectionResp { menus, states }
    }
}

fn collect_states(
    selector: &PermissionSelector,
    selected: &MenuSelection,
    nodes: &[MenuNode],
    states: &mut BTreeMap<i64, CheckState>,
) {
    for node in nodes {
        states.insert(node.menu_id, selector.check_state(selected, node));
        collect_states(selector, selected, &node.children, states);
    }
}

#[derive(Debug, Serialize)]
struct StatsResp {
    organizations: usize,
    menus: usize,
    roles: usize,
}

#[async_std::main]
async fn main() -> tide::Result<()> {
    env_logger::init();

    let args = Command::new("orgconsole")
        .about("Serves organization and menu trees for the admin console")
        .arg(
            Arg::new("listen-addr")
                .long("listen-addr")
                .default_value(DEFAULT_LISTEN_ADDR),
        )
        .arg(Arg::new("data-file").long("data-file"))
        .get_matches();

    let addr = args
        .get_one::<String>("listen-addr")
        .map(String::as_str)
        .unwrap_or(DEFAULT_LISTEN_ADDR)
        .to_string();

    if let Some(file) = args.get_one::<String>("data-file") {
        match Directory::load(file) {
            Ok(directory) => context().directory = directory,
            Err(e) => error!("load {} error {}", file, e),
        }
    }

    let app = server()?;
    info!("listening on {}", addr);
    app.listen(addr).await?;
    Ok(())
}

fn server() -> tide::Result<tide::Server<()>> {
    let mut app = tide::new();
    let cors = CorsMiddleware::new()
        .allow_methods("GET, POST, OPTIONS".parse::<HeaderValue>()?)
        .allow_origin(Origin::from("*"))
        .allow_credentials(false);
    app.with(cors);

    app.at("/health").get(api_health);
    app.at("/directory/load").post(api_load_directory);
    app.at("/organizations/tree").get(api_organization_tree);
    app.at("/organizations/options").get(api_organization_options);
    app.at("/organizations/:id/name").get(api_organization_name);
    app.at("/menus/tree").get(api_menu_tree);
    app.at("/menus/nodes").get(api_menu_nodes);
    app.at("/roles/:id/menus").get(api_role_menus);
    app.at("/roles/menus/toggle").post(api_toggle_menu);
    app.at("/roles/menus/repair").post(api_repair_menus);
    app.at("/sidebar").post(api_sidebar);
    app.at("/stats").get(api_stats);
    Ok(app)
}

fn reply<T: Serialize>(envelope: Envelope<T>) -> tide::Result {
    Ok(serde_json::to_value(envelope)?.into())
}

fn id_param(req: &Request<()>) -> tide::Result<i64> {
    req.param("id")?
        .parse::<i64>()
        .map_err(|e| tide::Error::from_str(StatusCode::BadRequest, format!("invalid id: {}", e)))
}

async fn api_health(_req: Request<()>) -> tide::Result {
    reply(Envelope::success("ok"))
}

async fn api_load_directory(mut req: Request<()>) -> tide::Result {
    let LoadDirectoryReq { file } = req.body_json().await?;
    match Directory::load(&file) {
        Ok(directory) => {
            context().directory = directory;
            reply(Envelope::success(file))
        }
        Err(e) => {
            error!("load {} error {}", file, e);
            let code = match e {
                DirectoryError::Adapt(_) => 502,
                _ => 500,
            };
            reply(Envelope::<()>::failure(
                code,
                format!("{} Failed to load directory", e),
            ))
        }
    }
}

async fn api_organization_tree(_req: Request<()>) -> tide::Result {
    let tree = context().directory.organization_tree();
    reply(Envelope::success(tree))
}

async fn api_organization_options(req: Request<()>) -> tide::Result {
    let OrganizationOptionsReq { exclude_id } = req.query()?;
    let options: Vec<OrganizationOption> = context()
        .directory
        .organization_options(exclude_id)
        .into_iter()
        .map(|entry| OrganizationOption {
            label: option_label(&entry),
            entry,
        })
        .collect();
    reply(Envelope::success(options))
}

async fn api_organization_name(req: Request<()>) -> tide::Result {
    let id = id_param(&req)?;
    let name = context().directory.organization_name(id);
    match name {
        Some(name) => reply(Envelope::success(name)),
        None => reply(Envelope {
            code: 404,
            message: format!("organization {} not found", id),
            data: Some(UNKNOWN_ORGANIZATION.to_string()),
        }),
    }
}

async fn api_menu_tree(_req: Request<()>) -> tide::Result {
    let tree = context().directory.menu_tree();
    reply(Envelope::success(tree))
}

async fn api_menu_nodes(_req: Request<()>) -> tide::Result {
    let nodes = context().directory.menu_nodes();
    reply(Envelope::success(nodes))
}

async fn api_role_menus(req: Request<()>) -> tide::Result {
    let id = id_param(&req)?;
    let ctx = context();
    let Some(role) = ctx.directory.role(id) else {
        return reply(Envelope::<()>::failure(404, format!("role {} not found", id)));
    };
    let selector = ctx.directory.selector();
    let menus = selector.repair(&MenuSelection::from_role(role));
    reply(Envelope::success(MenuSelectionResp::new(&selector, menus)))
}

async fn api_toggle_menu(mut req: Request<()>) -> tide::Result {
    let ToggleMenuReq { menus, menu_id } = req.body_json().await?;
    let selector = context().directory.selector();
    let next = selector.toggle_id(&menus, menu_id);
    info!(
        "toggled menu {}: {} -> {} selected",
        menu_id,
        menus.len(),
        next.len()
    );
    reply(Envelope::success(MenuSelectionResp::new(&selector, next)))
}

async fn api_repair_menus(mut req: Request<()>) -> tide::Result {
    let RepairMenusReq { menus } = req.body_json().await?;
    let selector = context().directory.selector();
    let next = selector.repair(&menus);
    if next != menus {
        warn!("repaired inconsistent menu selection {:?}", menus.ids());
    }
    reply(Envelope::success(MenuSelectionResp::new(&selector, next)))
}

async fn api_sidebar(mut req: Request<()>) -> tide::Result {
    let SidebarReq {
        name,
        role_name,
        menus,
    } = req.body_json().await?;
    let admin = is_admin(&name, role_name.as_deref());
    reply(Envelope::success(visible_menus(&menus, admin)))
}

async fn api_stats(_req: Request<()>) -> tide::Result {
    let ctx = context();
    let stats = StatsResp {
        organizations: count_nodes(&ctx.directory.organization_tree()),
        menus: count_nodes(&ctx.directory.menu_tree()),
        roles: ctx.directory.roles.len(),
    };
    reply(Envelope::success(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tide::http::{Method, Request as HttpRequest, Response as HttpResponse};

    fn load_fixture() {
        context().directory = Directory::load("../../tests/directory.json").unwrap();
    }

    async fn send(method: Method, path: &str, body: Option<Value>) -> HttpResponse {
        let app = server().unwrap();
        let mut req = HttpRequest::new(method, format!("http://localhost{}", path).as_str());
        if let Some(body) = body {
            req.set_body(tide::Body::from_json(&body).unwrap());
        }
        app.respond(req).await.unwrap()
    }

    async fn call(method: Method, path: &str, body: Option<Value>) -> Value {
        let mut res = send(method, path, body).await;
        res.body_json().await.unwrap()
    }

    fn envelope(body: Value) -> Envelope<Value> {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_toggle_endpoint() {
        load_fixture();
        async_std::task::block_on(async {
            let body = call(
                Method::Post,
                "/roles/menus/toggle",
                Some(json!({"menus": [{"menu_id": 2, "menu_name": "用户设置"}], "menu_id": 1})),
            )
            .await;
            assert_eq!(body["code"], 200);
            let ids: Vec<i64> = body["data"]["menus"]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["menu_id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, vec![1, 2, 3, 4]);
            assert_eq!(body["data"]["states"]["5"], "unchecked");
        });
    }

    #[test]
    fn test_role_menus_endpoint() {
        load_fixture();
        async_std::task::block_on(async {
            let body = call(Method::Get, "/roles/2/menus", None).await;
            assert_eq!(body["data"]["menus"], json!([{"menu_id": 2, "menu_name": "用户设置"}]));
            assert_eq!(body["data"]["states"]["1"], "partial");

            let body = call(Method::Get, "/roles/9/menus", None).await;
            assert_eq!(body["code"], 404);
        });
    }

    #[test]
    fn test_organization_endpoints() {
        load_fixture();
        async_std::task::block_on(async {
            let body = call(Method::Get, "/organizations/options?exclude_id=3", None).await;
            let labels: Vec<&str> = body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|o| o["label"].as_str().unwrap())
                .collect();
            assert_eq!(
                labels,
                vec!["总部", "\u{3000}研发中心", "\u{3000}\u{3000}研发一组", "\u{3000}\u{3000}\u{3000}平台小组"]
            );

            let body = call(Method::Get, "/organizations/42/name", None).await;
            assert_eq!(body["code"], 404);
            assert_eq!(body["data"], UNKNOWN_ORGANIZATION);
        });
    }

    #[test]
    fn test_stats_endpoint() {
        load_fixture();
        async_std::task::block_on(async {
            let body = call(Method::Get, "/stats", None).await;
            assert_eq!(body["data"], json!({"organizations": 5, "menus": 6, "roles": 2}));
        });
    }

    #[test]
    fn test_health_endpoint() {
        async_std::task::block_on(async {
            let reply = envelope(call(Method::Get, "/health", None).await);
            assert!(reply.is_success());
            assert_eq!(reply.data, Some(json!("ok")));
        });
    }

    #[test]
    fn test_load_missing_file() {
        async_std::task::block_on(async {
            let body = json!({"file": "../../tests/no-such-directory.json"});
            let reply = envelope(call(Method::Post, "/directory/load", Some(body)).await);
            assert!(!reply.is_success());
            assert_eq!(reply.code, 500);
        });
    }

    #[test]
    fn test_load_rejected_section() {
        let file = std::env::temp_dir()
            .join(format!("orgconsole-rejected-{}.json", std::process::id()));
        std::fs::write(&file, r#"{"menus": {"code": 403}}"#).unwrap();
        async_std::task::block_on(async {
            let body = json!({"file": file.to_string_lossy()});
            let reply = envelope(call(Method::Post, "/directory/load", Some(body)).await);
            assert_eq!(reply.code, 502);
            assert!(reply.data.is_none());
        });
        std::fs::remove_file(&file).unwrap();
    }

    #[test]
    fn test_malformed_id_is_bad_request() {
        async_std::task::block_on(async {
            let res = send(Method::Get, "/organizations/abc/name", None).await;
            assert_eq!(res.status(), StatusCode::BadRequest);
            let res = send(Method::Get, "/roles/x1/menus", None).await;
            assert_eq!(res.status(), StatusCode::BadRequest);
        });
    }

    #[test]
    fn test_repair_endpoint() {
        load_fixture();
        async_std::task::block_on(async {
            // menu 1 has children, none of them selected
            let body = json!({"menus": [{"menu_id": 1, "menu_name": "用户管理"}]});
            let reply = envelope(call(Method::Post, "/roles/menus/repair", Some(body)).await);
            assert!(reply.is_success());
            let data = reply.data.unwrap();
            assert_eq!(data["menus"], json!([]));
            assert_eq!(data["states"]["1"], "unchecked");
        });
    }

    #[test]
    fn test_sidebar_hides_unauthorized() {
        async_std::task::block_on(async {
            let menus = json!([
                {"id": 1, "name": "用户管理", "is_authorized": false},
                {"id": 5, "name": "系统设置"}
            ]);
            let body = json!({"name": "alice", "role_name": "auditor", "menus": menus});
            let reply = envelope(call(Method::Post, "/sidebar", Some(body)).await);
            assert!(reply.is_success());
            assert_eq!(reply.data, Some(json!([])));

            let body = json!({"name": "admin", "menus": menus});
            let reply = envelope(call(Method::Post, "/sidebar", Some(body)).await);
            let data = reply.data.unwrap();
            let names: Vec<&str> = data
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["name"].as_str().unwrap())
                .collect();
            assert_eq!(names, vec!["用户管理", "系统设置"]);
        });
    }

    #[test]
    fn test_menu_endpoints() {
        load_fixture();
        async_std::task::block_on(async {
            let body = call(Method::Get, "/menus/tree", None).await;
            let roots: Vec<i64> = body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["id"].as_i64().unwrap())
                .collect();
            assert_eq!(roots, vec![1, 5]);
            assert_eq!(body["data"][0]["children"].as_array().unwrap().len(), 3);

            let body = call(Method::Get, "/menus/nodes", None).await;
            assert_eq!(body["data"][1]["menu_id"], 5);
            assert_eq!(body["data"][1]["menu_name"], "系统设置");
            assert_eq!(body["data"][1]["children"][0]["menu_id"], 6);
        });
    }
}
