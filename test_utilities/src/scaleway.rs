//! In-memory Scaleway, answering the REST API through the transport seam and object storage through
//! its own seam. Asynchronous entities go through transitional statuses for a few polls before
//! settling, like the real API does.

use async_trait::async_trait;
use qovery_scaleway_provider::errors::ApiError;
use qovery_scaleway_provider::locality::ScwRegion;
use qovery_scaleway_provider::services::scaleway::object_storage::{
    ALL_USERS_GROUP_URI, CopyObjectInPlace, Grant, ObjectHead, ObjectStorageApi, PUBLIC_READ_ACL, PutObject,
};
use qovery_scaleway_provider::services::scaleway::{ApiRequest, ApiTransport, Method};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_VOLUME_TYPE: &str = "bssd";
pub const DEFAULT_VOLUME_SIZE: u64 = 5_000_000_000;

fn not_found(resource: &str) -> ApiError {
    ApiError::new(404, Some("not_found"), &format!("{resource} not found"))
}

fn transient_state(resource: &str, status: &str) -> ApiError {
    ApiError::new(
        409,
        Some("transient_state"),
        &format!("{resource} is in a transient state: {status}"),
    )
}

fn invalid_arguments(message: &str) -> ApiError {
    ApiError::new(400, Some("invalid_arguments"), message)
}

fn str_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(|v| v.as_str()).unwrap_or_default()
}

/// One page of `items`, as list endpoints return them.
fn page(request: &ApiRequest, field: &str, items: Vec<Value>) -> Value {
    let page: usize = request.query_value("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: usize = request
        .query_value("page_size")
        .and_then(|p| p.parse().ok())
        .unwrap_or(100);
    let total_count = items.len();
    let items: Vec<Value> = items
        .into_iter()
        .skip((page.max(1) - 1) * page_size)
        .take(page_size)
        .collect();

    json!({ field: items, "total_count": total_count })
}

fn matches_filters(request: &ApiRequest, entity: &Value, project_field: &str) -> bool {
    let name_ok = match request.query_value("name") {
        Some(name) => str_field(entity, "name").contains(name),
        None => true,
    };
    let project_ok = match request.query_value(project_field) {
        Some(project) => str_field(entity, "project_id") == project || str_field(entity, "project") == project,
        None => true,
    };
    name_ok && project_ok
}

struct FakeInstance {
    json: Value,
    /// GET polls left before the current transitional status settles.
    pending_polls: u32,
    databases: Vec<Value>,
    users: Vec<Value>,
    passwords: BTreeMap<String, String>,
    privileges: Vec<Value>,
    acl_rules: Vec<Value>,
}

impl FakeInstance {
    fn status(&self) -> &str {
        str_field(&self.json, "status")
    }

    fn set_status(&mut self, status: &str, pending_polls: u32) {
        self.json["status"] = json!(status);
        self.pending_polls = pending_polls;
    }

    fn ensure_ready(&self) -> Result<(), ApiError> {
        match self.status() {
            "ready" => Ok(()),
            status => Err(transient_state("instance", status)),
        }
    }
}

struct FakeSecurityGroup {
    json: Value,
    rules: Vec<Value>,
}

#[derive(Default)]
struct State {
    instances: BTreeMap<String, FakeInstance>,
    namespaces: BTreeMap<String, Value>,
    security_groups: BTreeMap<String, FakeSecurityGroup>,
    calls: Vec<ApiRequest>,
    failures: VecDeque<(Method, String, ApiError)>,
}

/// FakeScaleway: DocumentDB, Registry and Instance security group endpoints.
pub struct FakeScaleway {
    state: Mutex<State>,
    /// polls needed for an instance to leave a transitional status
    polls_before_settled: u32,
}

impl Default for FakeScaleway {
    fn default() -> Self {
        FakeScaleway::new(2)
    }
}

impl FakeScaleway {
    pub fn new(polls_before_settled: u32) -> Self {
        FakeScaleway {
            state: Mutex::new(State::default()),
            polls_before_settled,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake scaleway state is poisoned")
    }

    /// Next call matching `method` on a path containing `path_fragment` fails with `error`.
    pub fn fail_next(&self, method: Method, path_fragment: &str, error: ApiError) {
        self.state().failures.push_back((method, path_fragment.to_string(), error));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, method: Method, path_suffix: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path.ends_with(path_suffix))
            .count()
    }

    pub fn instance(&self, instance_id: &str) -> Option<Value> {
        self.state().instances.get(instance_id).map(|i| i.json.clone())
    }

    pub fn instance_count(&self) -> usize {
        self.state().instances.len()
    }

    pub fn user_password(&self, instance_id: &str, user_name: &str) -> Option<String> {
        self.state()
            .instances
            .get(instance_id)
            .and_then(|i| i.passwords.get(user_name).cloned())
    }

    pub fn privileges(&self, instance_id: &str) -> Vec<Value> {
        self.state()
            .instances
            .get(instance_id)
            .map(|i| i.privileges.clone())
            .unwrap_or_default()
    }

    /// Puts an instance in `status`, as if something happened on the cloud side.
    pub fn set_instance_status(&self, instance_id: &str, status: &str, pending_polls: u32) {
        if let Some(instance) = self.state().instances.get_mut(instance_id) {
            instance.set_status(status, pending_polls);
        }
    }

    /// Database created by the cloud itself, tests can't delete it.
    pub fn add_managed_database(&self, instance_id: &str, name: &str) {
        if let Some(instance) = self.state().instances.get_mut(instance_id) {
            instance
                .databases
                .push(json!({ "name": name, "owner": "", "managed": true, "size": 0 }));
        }
    }

    pub fn add_namespace(&self, region: ScwRegion, name: &str, project_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let namespace = json!({
            "id": id,
            "name": name,
            "description": "",
            "project_id": project_id,
            "status": "ready",
            "endpoint": format!("rg.{}.scw.cloud/{}", region, name),
            "is_public": false,
            "size": 0,
            "region": region.to_string(),
        });
        self.state().namespaces.insert(id.clone(), namespace);
        id
    }

    /// Puts a namespace in `status`, it stays there until changed again.
    pub fn set_namespace_status(&self, namespace_id: &str, status: &str) {
        if let Some(namespace) = self.state().namespaces.get_mut(namespace_id) {
            namespace["status"] = json!(status);
        }
    }

    pub fn namespace_count(&self) -> usize {
        self.state().namespaces.len()
    }

    /// Seeds a security group holding one rule managed by the cloud.
    pub fn add_security_group(&self, zone: &str, name: &str, project_id: &str, project_default: bool) -> String {
        let id = Uuid::new_v4().to_string();
        let security_group = FakeSecurityGroup {
            json: json!({
                "id": id,
                "name": name,
                "description": "",
                "project": project_id,
                "project_default": project_default,
                "stateful": true,
                "zone": zone,
            }),
            rules: vec![json!({
                "id": Uuid::new_v4().to_string(),
                "protocol": "TCP",
                "direction": "outbound",
                "action": "drop",
                "ip_range": "0.0.0.0/0",
                "dest_port_from": 25,
                "position": 0,
                "editable": false,
            })],
        };
        self.state().security_groups.insert(id.clone(), security_group);
        id
    }

    pub fn security_group_exists(&self, security_group_id: &str) -> bool {
        self.state().security_groups.contains_key(security_group_id)
    }

    pub fn security_group_rules(&self, security_group_id: &str) -> Vec<Value> {
        self.state()
            .security_groups
            .get(security_group_id)
            .map(|sg| sg.rules.clone())
            .unwrap_or_default()
    }

    fn handle(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let segments: Vec<String> = request
            .path
            .trim_start_matches('/')
            .split('/')
            .map(|s| urlencoding::decode(s).map(|s| s.into_owned()).unwrap_or_else(|_| s.to_string()))
            .collect();
        let segments: Vec<&str> = segments.iter().map(|s| s.as_str()).collect();
        let body = request.body.clone().unwrap_or(Value::Null);
        let mut state = self.state();

        match (request.method, segments.as_slice()) {
            // documentdb instances
            (Method::Get, ["document-db", _, "regions", _, "instances"]) => {
                let items = state
                    .instances
                    .values()
                    .filter(|i| matches_filters(request, &i.json, "project_id"))
                    .map(|i| i.json.clone())
                    .collect();
                Ok(page(request, "instances", items))
            }
            (Method::Post, ["document-db", _, "regions", region, "instances"]) => {
                let id = Uuid::new_v4().to_string();
                let volume_type = body
                    .get("volume_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or(DEFAULT_VOLUME_TYPE);
                let volume_size = body
                    .get("volume_size")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(DEFAULT_VOLUME_SIZE);
                let json = json!({
                    "id": id,
                    "name": str_field(&body, "name"),
                    "project_id": str_field(&body, "project_id"),
                    "status": "provisioning",
                    "engine": str_field(&body, "engine"),
                    "node_type": str_field(&body, "node_type"),
                    "is_ha_cluster": body.get("is_ha_cluster").and_then(|v| v.as_bool()).unwrap_or(false),
                    "volume": { "type": volume_type, "size": volume_size },
                    "tags": body.get("tags").cloned().unwrap_or_else(|| json!([])),
                    "settings": [],
                    "init_settings": body.get("init_settings").cloned().unwrap_or_else(|| json!([])),
                    "endpoints": [{ "id": Uuid::new_v4().to_string(), "ip": "51.159.0.10", "port": 27017, "name": null }],
                    "region": region,
                    "created_at": "2026-10-16T00:00:00Z",
                });
                let user_name = str_field(&body, "user_name").to_string();
                let mut instance = FakeInstance {
                    json: json.clone(),
                    pending_polls: self.polls_before_settled,
                    databases: vec![],
                    users: vec![],
                    passwords: BTreeMap::new(),
                    privileges: vec![],
                    acl_rules: vec![],
                };
                if !user_name.is_empty() {
                    instance.users.push(json!({ "name": user_name, "is_admin": true }));
                    instance
                        .passwords
                        .insert(user_name, str_field(&body, "password").to_string());
                }
                state.instances.insert(id, instance);
                Ok(json)
            }
            (Method::Get, ["document-db", _, "regions", _, "instances", id]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                if instance.pending_polls > 0 {
                    instance.pending_polls -= 1;
                    return Ok(instance.json.clone());
                }
                let status = instance.status().to_string();
                match status.as_str() {
                    "deleting" => {
                        state.instances.remove(*id);
                        Err(not_found("instance"))
                    }
                    "creating" | "provisioning" | "configuring" | "initializing" | "updating" => {
                        instance.set_status("ready", 0);
                        Ok(instance.json.clone())
                    }
                    _ => Ok(instance.json.clone()),
                }
            }
            (Method::Patch, ["document-db", _, "regions", _, "instances", id]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                if let Some(name) = body.get("name") {
                    instance.json["name"] = name.clone();
                }
                if let Some(tags) = body.get("tags") {
                    instance.json["tags"] = tags.clone();
                }
                Ok(instance.json.clone())
            }
            (Method::Delete, ["document-db", _, "regions", _, "instances", id]) => {
                let polls = self.polls_before_settled;
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                instance.set_status("deleting", polls);
                Ok(Value::Null)
            }
            (Method::Post, ["document-db", _, "regions", _, "instances", id, "upgrade"]) => {
                let polls = self.polls_before_settled;
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                if let Some(node_type) = body.get("node_type") {
                    instance.json["node_type"] = node_type.clone();
                } else if body.get("enable_ha").is_some() {
                    instance.json["is_ha_cluster"] = json!(true);
                } else if let Some(volume_type) = body.get("volume_type") {
                    instance.json["volume"]["type"] = volume_type.clone();
                } else if let Some(volume_size) = body.get("volume_size") {
                    instance.json["volume"]["size"] = volume_size.clone();
                } else {
                    return Err(invalid_arguments("one upgrade field is expected"));
                }
                instance.set_status("updating", polls);
                Ok(instance.json.clone())
            }
            (Method::Put, ["document-db", _, "regions", _, "instances", id, "settings"]) => {
                let polls = self.polls_before_settled;
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let mut settings: BTreeMap<String, Value> = instance.json["settings"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| (str_field(&s, "name").to_string(), s))
                    .collect();
                for setting in body["settings"].as_array().cloned().unwrap_or_default() {
                    settings.insert(str_field(&setting, "name").to_string(), setting);
                }
                instance.json["settings"] = json!(settings.into_values().collect::<Vec<Value>>());
                instance.set_status("configuring", polls);
                Ok(json!({ "settings": instance.json["settings"] }))
            }

            // documentdb databases
            (Method::Get, ["document-db", _, "regions", _, "instances", id, "databases"]) => {
                let instance = state.instances.get(*id).ok_or_else(|| not_found("instance"))?;
                let items = instance
                    .databases
                    .iter()
                    .filter(|d| matches_filters(request, d, "project_id"))
                    .cloned()
                    .collect();
                Ok(page(request, "databases", items))
            }
            (Method::Post, ["document-db", _, "regions", _, "instances", id, "databases"]) => {
                let polls = self.polls_before_settled;
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let name = str_field(&body, "name");
                if instance.databases.iter().any(|d| str_field(d, "name") == name) {
                    return Err(invalid_arguments(&format!("database {name} already exists")));
                }
                let database = json!({ "name": name, "owner": "", "managed": false, "size": 0 });
                instance.databases.push(database.clone());
                instance.set_status("configuring", polls);
                Ok(database)
            }
            (Method::Delete, ["document-db", _, "regions", _, "instances", id, "databases", name]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let before = instance.databases.len();
                instance.databases.retain(|d| str_field(d, "name") != *name);
                if before == instance.databases.len() {
                    return Err(not_found("database"));
                }
                instance.privileges.retain(|p| str_field(p, "database_name") != *name);
                Ok(Value::Null)
            }

            // documentdb users
            (Method::Get, ["document-db", _, "regions", _, "instances", id, "users"]) => {
                let instance = state.instances.get(*id).ok_or_else(|| not_found("instance"))?;
                let items = instance
                    .users
                    .iter()
                    .filter(|u| matches_filters(request, u, "project_id"))
                    .cloned()
                    .collect();
                Ok(page(request, "users", items))
            }
            (Method::Post, ["document-db", _, "regions", _, "instances", id, "users"]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let name = str_field(&body, "name").to_string();
                if instance.users.iter().any(|u| str_field(u, "name") == name) {
                    return Err(invalid_arguments(&format!("user {name} already exists")));
                }
                let user = json!({
                    "name": name,
                    "is_admin": body.get("is_admin").and_then(|v| v.as_bool()).unwrap_or(false),
                });
                instance.users.push(user.clone());
                instance
                    .passwords
                    .insert(name, str_field(&body, "password").to_string());
                Ok(user)
            }
            (Method::Patch, ["document-db", _, "regions", _, "instances", id, "users", name]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let user = instance
                    .users
                    .iter_mut()
                    .find(|u| str_field(u, "name") == *name)
                    .ok_or_else(|| not_found("user"))?;
                if let Some(is_admin) = body.get("is_admin") {
                    user["is_admin"] = is_admin.clone();
                }
                let user = user.clone();
                if let Some(password) = body.get("password").and_then(|p| p.as_str()) {
                    instance.passwords.insert(name.to_string(), password.to_string());
                }
                Ok(user)
            }
            (Method::Delete, ["document-db", _, "regions", _, "instances", id, "users", name]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let before = instance.users.len();
                instance.users.retain(|u| str_field(u, "name") != *name);
                if before == instance.users.len() {
                    return Err(not_found("user"));
                }
                instance.passwords.remove(*name);
                instance.privileges.retain(|p| str_field(p, "user_name") != *name);
                Ok(Value::Null)
            }

            // documentdb privileges
            (Method::Get, ["document-db", _, "regions", _, "instances", id, "privileges"]) => {
                let instance = state.instances.get(*id).ok_or_else(|| not_found("instance"))?;
                let items = instance
                    .privileges
                    .iter()
                    .filter(|p| {
                        request
                            .query_value("database_name")
                            .is_none_or(|db| str_field(p, "database_name") == db)
                            && request
                                .query_value("user_name")
                                .is_none_or(|user| str_field(p, "user_name") == user)
                    })
                    .cloned()
                    .collect();
                Ok(page(request, "privileges", items))
            }
            (Method::Put, ["document-db", _, "regions", _, "instances", id, "privileges"]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let database_name = str_field(&body, "database_name");
                let user_name = str_field(&body, "user_name");
                if !instance.databases.iter().any(|d| str_field(d, "name") == database_name) {
                    return Err(not_found("database"));
                }
                if !instance.users.iter().any(|u| str_field(u, "name") == user_name) {
                    return Err(not_found("user"));
                }
                instance
                    .privileges
                    .retain(|p| !(str_field(p, "database_name") == database_name && str_field(p, "user_name") == user_name));
                let privilege = json!({
                    "database_name": database_name,
                    "user_name": user_name,
                    "permission": str_field(&body, "permission"),
                });
                if str_field(&body, "permission") != "none" {
                    instance.privileges.push(privilege.clone());
                }
                Ok(privilege)
            }

            // documentdb acls
            (Method::Get, ["document-db", _, "regions", _, "instances", id, "acls"]) => {
                let instance = state.instances.get(*id).ok_or_else(|| not_found("instance"))?;
                Ok(page(request, "rules", instance.acl_rules.clone()))
            }
            (Method::Put, ["document-db", _, "regions", _, "instances", id, "acls"]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                instance.acl_rules = body["rules"].as_array().cloned().unwrap_or_default();
                Ok(json!({ "rules": instance.acl_rules }))
            }
            (Method::Delete, ["document-db", _, "regions", _, "instances", id, "acls"]) => {
                let instance = state.instances.get_mut(*id).ok_or_else(|| not_found("instance"))?;
                instance.ensure_ready()?;
                let ips: Vec<String> = body["acl_rule_ips"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|ip| ip.as_str().map(|s| s.to_string()))
                    .collect();
                instance.acl_rules.retain(|r| !ips.contains(&str_field(r, "ip").to_string()));
                Ok(Value::Null)
            }

            // registry namespaces
            (Method::Get, ["registry", _, "regions", _, "namespaces"]) => {
                let items = state
                    .namespaces
                    .values()
                    .filter(|n| matches_filters(request, n, "project_id"))
                    .cloned()
                    .collect();
                Ok(page(request, "namespaces", items))
            }
            (Method::Post, ["registry", _, "regions", region, "namespaces"]) => {
                let id = Uuid::new_v4().to_string();
                let name = str_field(&body, "name");
                let namespace = json!({
                    "id": id,
                    "name": name,
                    "description": str_field(&body, "description"),
                    "project_id": str_field(&body, "project_id"),
                    "status": "ready",
                    "endpoint": format!("rg.{region}.scw.cloud/{name}"),
                    "is_public": body.get("is_public").and_then(|v| v.as_bool()).unwrap_or(false),
                    "size": 0,
                    "region": region,
                });
                state.namespaces.insert(id, namespace.clone());
                Ok(namespace)
            }
            (Method::Get, ["registry", _, "regions", _, "namespaces", id]) => {
                state.namespaces.get(*id).cloned().ok_or_else(|| not_found("namespace"))
            }
            (Method::Patch, ["registry", _, "regions", _, "namespaces", id]) => {
                let namespace = state.namespaces.get_mut(*id).ok_or_else(|| not_found("namespace"))?;
                if let Some(description) = body.get("description") {
                    namespace["description"] = description.clone();
                }
                if let Some(is_public) = body.get("is_public") {
                    namespace["is_public"] = is_public.clone();
                }
                Ok(namespace.clone())
            }
            (Method::Delete, ["registry", _, "regions", _, "namespaces", id]) => state
                .namespaces
                .remove(*id)
                .map(|_| Value::Null)
                .ok_or_else(|| not_found("namespace")),

            // instance security groups
            (Method::Get, ["instance", _, "zones", _, "security_groups"]) => {
                let items = state
                    .security_groups
                    .values()
                    .filter(|sg| matches_filters(request, &sg.json, "project"))
                    .map(|sg| sg.json.clone())
                    .collect();
                Ok(page(request, "security_groups", items))
            }
            (Method::Get, ["instance", _, "zones", _, "security_groups", id]) => state
                .security_groups
                .get(*id)
                .map(|sg| json!({ "security_group": sg.json }))
                .ok_or_else(|| not_found("security_group")),
            (Method::Delete, ["instance", _, "zones", _, "security_groups", id]) => {
                let security_group = state.security_groups.get(*id).ok_or_else(|| not_found("security_group"))?;
                if security_group.json["project_default"].as_bool() == Some(true) {
                    return Err(invalid_arguments("the default security group cannot be deleted"));
                }
                state.security_groups.remove(*id);
                Ok(Value::Null)
            }
            (Method::Get, ["instance", _, "zones", _, "security_groups", id, "rules"]) => {
                let security_group = state.security_groups.get(*id).ok_or_else(|| not_found("security_group"))?;
                Ok(page(request, "rules", security_group.rules.clone()))
            }
            (Method::Put, ["instance", _, "zones", _, "security_groups", id, "rules"]) => {
                let security_group = state
                    .security_groups
                    .get_mut(*id)
                    .ok_or_else(|| not_found("security_group"))?;
                let mut rules: Vec<Value> = security_group
                    .rules
                    .iter()
                    .filter(|r| r["editable"].as_bool() == Some(false))
                    .cloned()
                    .collect();
                for mut rule in body["rules"].as_array().cloned().unwrap_or_default() {
                    rule["id"] = json!(Uuid::new_v4().to_string());
                    rule["editable"] = json!(true);
                    rules.push(rule);
                }
                security_group.rules = rules;
                Ok(json!({ "rules": security_group.rules }))
            }

            _ => Err(ApiError::new(
                404,
                Some("not_found"),
                &format!("no route for {} {}", request.method, request.path),
            )),
        }
    }
}

#[async_trait]
impl ApiTransport for FakeScaleway {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        {
            let mut state = self.state();
            state.calls.push(request.clone());

            let failure = state
                .failures
                .iter()
                .position(|(method, fragment, _)| *method == request.method && request.path.contains(fragment.as_str()));
            if let Some(index) = failure {
                if let Some((_, _, error)) = state.failures.remove(index) {
                    return Err(error);
                }
            }
        }

        self.handle(&request)
    }
}

/// Object as stored by [`FakeObjectStorage`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub storage_class: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub acl: String,
}

#[derive(Default)]
struct ObjectStorageState {
    objects: BTreeMap<(String, String, String), StoredObject>,
    policies: BTreeMap<(String, String), String>,
    calls: Vec<String>,
}

/// FakeObjectStorage: buckets always exist, objects and policies are kept in memory.
#[derive(Default)]
pub struct FakeObjectStorage {
    state: Mutex<ObjectStorageState>,
}

fn object_key(region: ScwRegion, bucket: &str, key: &str) -> (String, String, String) {
    (region.to_string(), bucket.to_string(), key.to_string())
}

fn no_such_key(bucket: &str, key: &str) -> ApiError {
    ApiError::new(404, Some("NoSuchKey"), &format!("{bucket}/{key} does not exist"))
}

impl FakeObjectStorage {
    fn state(&self) -> std::sync::MutexGuard<'_, ObjectStorageState> {
        self.state.lock().expect("fake object storage state is poisoned")
    }

    /// Operations called, in order: `put_object`, `copy_object_in_place`...
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn object(&self, region: ScwRegion, bucket: &str, key: &str) -> Option<StoredObject> {
        self.state().objects.get(&object_key(region, bucket, key)).cloned()
    }

    pub fn policy(&self, region: ScwRegion, bucket: &str) -> Option<String> {
        self.state()
            .policies
            .get(&(region.to_string(), bucket.to_string()))
            .cloned()
    }

    /// Replaces a policy behind the provider's back, formatting it differently for instance.
    pub fn set_policy(&self, region: ScwRegion, bucket: &str, policy: &str) {
        self.state()
            .policies
            .insert((region.to_string(), bucket.to_string()), policy.to_string());
    }

    fn record(&self, call: &str) -> std::sync::MutexGuard<'_, ObjectStorageState> {
        let mut state = self.state();
        state.calls.push(call.to_string());
        state
    }
}

#[async_trait]
impl ObjectStorageApi for FakeObjectStorage {
    async fn put_object(&self, region: ScwRegion, request: PutObject) -> Result<(), ApiError> {
        let mut state = self.record("put_object");
        let object = StoredObject {
            body: request.body,
            content_type: Some(
                request
                    .content_type
                    .unwrap_or_else(|| "binary/octet-stream".to_string()),
            ),
            metadata: request.metadata,
            storage_class: Some(request.storage_class.unwrap_or_else(|| "STANDARD".to_string())),
            tags: request.tags,
            acl: request.acl.unwrap_or_else(|| "private".to_string()),
        };
        state
            .objects
            .insert(object_key(region, &request.bucket, &request.key), object);
        Ok(())
    }

    async fn copy_object_in_place(&self, region: ScwRegion, request: CopyObjectInPlace) -> Result<(), ApiError> {
        let mut state = self.record("copy_object_in_place");
        let object = state
            .objects
            .get_mut(&object_key(region, &request.bucket, &request.key))
            .ok_or_else(|| no_such_key(&request.bucket, &request.key))?;
        if request.content_type.is_some() {
            object.content_type = request.content_type;
        }
        if request.storage_class.is_some() {
            object.storage_class = request.storage_class;
        }
        object.metadata = request.metadata;
        Ok(())
    }

    async fn head_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<ObjectHead, ApiError> {
        let state = self.record("head_object");
        let object = state
            .objects
            .get(&object_key(region, bucket, key))
            .ok_or_else(|| no_such_key(bucket, key))?;
        Ok(ObjectHead {
            content_type: object.content_type.clone(),
            metadata: object.metadata.clone(),
            storage_class: object.storage_class.clone(),
            etag: Some(format!("\"{}\"", object.body.len())),
            content_length: Some(object.body.len() as i64),
        })
    }

    async fn get_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let state = self.record("get_object_tagging");
        state
            .objects
            .get(&object_key(region, bucket, key))
            .map(|o| o.tags.clone())
            .ok_or_else(|| no_such_key(bucket, key))
    }

    async fn put_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let mut state = self.record("put_object_tagging");
        let object = state
            .objects
            .get_mut(&object_key(region, bucket, key))
            .ok_or_else(|| no_such_key(bucket, key))?;
        object.tags = tags.clone();
        Ok(())
    }

    async fn get_object_acl(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<Vec<Grant>, ApiError> {
        let state = self.record("get_object_acl");
        let object = state
            .objects
            .get(&object_key(region, bucket, key))
            .ok_or_else(|| no_such_key(bucket, key))?;

        let mut grants = vec![Grant {
            grantee_uri: None,
            grantee_id: Some("owner".to_string()),
            permission: "FULL_CONTROL".to_string(),
        }];
        if object.acl == PUBLIC_READ_ACL {
            grants.push(Grant {
                grantee_uri: Some(ALL_USERS_GROUP_URI.to_string()),
                grantee_id: None,
                permission: "READ".to_string(),
            });
        }
        Ok(grants)
    }

    async fn put_object_acl(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
        canned_acl: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.record("put_object_acl");
        let object = state
            .objects
            .get_mut(&object_key(region, bucket, key))
            .ok_or_else(|| no_such_key(bucket, key))?;
        object.acl = canned_acl.to_string();
        Ok(())
    }

    async fn delete_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<(), ApiError> {
        let mut state = self.record("delete_object");
        state
            .objects
            .remove(&object_key(region, bucket, key))
            .map(|_| ())
            .ok_or_else(|| no_such_key(bucket, key))
    }

    async fn get_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<String, ApiError> {
        let state = self.record("get_bucket_policy");
        state
            .policies
            .get(&(region.to_string(), bucket.to_string()))
            .cloned()
            .ok_or_else(|| ApiError::new(404, Some("NoSuchBucketPolicy"), "The bucket policy does not exist"))
    }

    async fn put_bucket_policy(&self, region: ScwRegion, bucket: &str, policy: &str) -> Result<(), ApiError> {
        let mut state = self.record("put_bucket_policy");
        state
            .policies
            .insert((region.to_string(), bucket.to_string()), policy.to_string());
        Ok(())
    }

    async fn delete_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<(), ApiError> {
        let mut state = self.record("delete_bucket_policy");
        state
            .policies
            .remove(&(region.to_string(), bucket.to_string()))
            .map(|_| ())
            .ok_or_else(|| ApiError::new(404, Some("NoSuchBucketPolicy"), "The bucket policy does not exist"))
    }
}
