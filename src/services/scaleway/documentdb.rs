use crate::errors::ProviderResult;
use crate::locality::ScwRegion;
use crate::marshalling::KeyValue;
use crate::reconcile::StatusClass;
use crate::services::scaleway::client::{ApiRequest, ScwClient};
use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use strum_macros::{Display, EnumString};

/// Status of an instance as reported by the API. Statuses this crate does not know are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceStatus {
    Ready,
    Creating,
    Provisioning,
    Configuring,
    Initializing,
    Updating,
    Deleting,
    Autohealing,
    Backuping,
    Snapshotting,
    Restarting,
    Error,
    Locked,
    DiskFull,
    Unknown(String),
}

impl InstanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InstanceStatus::Ready => "ready",
            InstanceStatus::Creating => "creating",
            InstanceStatus::Provisioning => "provisioning",
            InstanceStatus::Configuring => "configuring",
            InstanceStatus::Initializing => "initializing",
            InstanceStatus::Updating => "updating",
            InstanceStatus::Deleting => "deleting",
            InstanceStatus::Autohealing => "autohealing",
            InstanceStatus::Backuping => "backuping",
            InstanceStatus::Snapshotting => "snapshotting",
            InstanceStatus::Restarting => "restarting",
            InstanceStatus::Error => "error",
            InstanceStatus::Locked => "locked",
            InstanceStatus::DiskFull => "disk_full",
            InstanceStatus::Unknown(status) => status.as_str(),
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            InstanceStatus::Ready => StatusClass::TerminalOk,
            InstanceStatus::Error | InstanceStatus::Locked | InstanceStatus::DiskFull | InstanceStatus::Unknown(_) => {
                StatusClass::TerminalBad(self.to_string())
            }
            _ => StatusClass::Transitional,
        }
    }
}

impl From<String> for InstanceStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "ready" => InstanceStatus::Ready,
            "creating" => InstanceStatus::Creating,
            "provisioning" => InstanceStatus::Provisioning,
            "configuring" => InstanceStatus::Configuring,
            "initializing" => InstanceStatus::Initializing,
            "updating" => InstanceStatus::Updating,
            "deleting" => InstanceStatus::Deleting,
            "autohealing" => InstanceStatus::Autohealing,
            "backuping" => InstanceStatus::Backuping,
            "snapshotting" => InstanceStatus::Snapshotting,
            "restarting" => InstanceStatus::Restarting,
            "error" => InstanceStatus::Error,
            "locked" => InstanceStatus::Locked,
            "disk_full" => InstanceStatus::DiskFull,
            _ => InstanceStatus::Unknown(status),
        }
    }
}

impl From<InstanceStatus> for String {
    fn from(status: InstanceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceSetting {
    pub name: String,
    pub value: String,
}

impl From<KeyValue> for InstanceSetting {
    fn from(setting: KeyValue) -> Self {
        InstanceSetting {
            name: setting.key,
            value: setting.value,
        }
    }
}

impl From<&InstanceSetting> for KeyValue {
    fn from(setting: &InstanceSetting) -> Self {
        KeyValue {
            key: setting.name.clone(),
            value: setting.value.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Volume {
    #[serde(rename = "type")]
    pub volume_type: String,
    /// bytes
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    pub id: String,
    pub ip: Option<String>,
    pub port: u32,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub status: InstanceStatus,
    pub engine: String,
    pub node_type: String,
    pub is_ha_cluster: bool,
    pub volume: Option<Volume>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub settings: Vec<InstanceSetting>,
    #[serde(default)]
    pub init_settings: Vec<InstanceSetting>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    pub region: String,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateInstanceRequest {
    pub project_id: String,
    pub name: String,
    pub engine: String,
    pub user_name: String,
    pub password: String,
    pub node_type: String,
    pub is_ha_cluster: bool,
    pub tags: Vec<String>,
    pub init_settings: Vec<InstanceSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UpdateInstanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateInstanceRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tags.is_none()
    }
}

/// One upgrade dimension, the API accepts exactly one per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstanceUpgrade {
    NodeType(String),
    EnableHa,
    VolumeType(String),
    /// bytes
    VolumeSize(u64),
}

impl InstanceUpgrade {
    fn body(&self) -> serde_json::Value {
        match self {
            InstanceUpgrade::NodeType(node_type) => json!({ "node_type": node_type }),
            InstanceUpgrade::EnableHa => json!({ "enable_ha": true }),
            InstanceUpgrade::VolumeType(volume_type) => json!({ "volume_type": volume_type }),
            InstanceUpgrade::VolumeSize(size) => json!({ "volume_size": size }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    Readonly,
    Readwrite,
    All,
    Custom,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Privilege {
    pub permission: Permission,
    pub database_name: String,
    pub user_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AclRule {
    pub ip: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone)]
pub struct DocumentDbApi {
    client: ScwClient,
}

impl DocumentDbApi {
    pub fn new(client: ScwClient) -> Self {
        DocumentDbApi { client }
    }

    fn instances_path(region: ScwRegion) -> String {
        format!("/document-db/v1beta1/regions/{region}/instances")
    }

    fn instance_path(region: ScwRegion, instance_id: &str) -> String {
        format!("{}/{}", Self::instances_path(region), instance_id)
    }

    pub async fn list_instances(
        &self,
        region: ScwRegion,
        name: Option<&str>,
        project_id: Option<&str>,
    ) -> ProviderResult<Vec<Instance>> {
        let request = ApiRequest::get(Self::instances_path(region))
            .with_optional_query("name", name)
            .with_optional_query("project_id", project_id);
        self.client.list_all(request, "instances").await
    }

    pub async fn create_instance(&self, region: ScwRegion, request: &CreateInstanceRequest) -> ProviderResult<Instance> {
        let body = json!(request);
        self.client
            .send(ApiRequest::post(Self::instances_path(region), body))
            .await
    }

    pub async fn get_instance(&self, region: ScwRegion, instance_id: &str) -> ProviderResult<Instance> {
        self.client
            .send(ApiRequest::get(Self::instance_path(region, instance_id)))
            .await
    }

    pub async fn update_instance(
        &self,
        region: ScwRegion,
        instance_id: &str,
        request: &UpdateInstanceRequest,
    ) -> ProviderResult<Instance> {
        let body = json!(request);
        self.client
            .send(ApiRequest::patch(Self::instance_path(region, instance_id), body))
            .await
    }

    pub async fn upgrade_instance(
        &self,
        region: ScwRegion,
        instance_id: &str,
        upgrade: &InstanceUpgrade,
    ) -> ProviderResult<Instance> {
        self.client
            .send(ApiRequest::post(
                format!("{}/upgrade", Self::instance_path(region, instance_id)),
                upgrade.body(),
            ))
            .await
    }

    pub async fn set_instance_settings(
        &self,
        region: ScwRegion,
        instance_id: &str,
        settings: &[InstanceSetting],
    ) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::put(
                format!("{}/settings", Self::instance_path(region, instance_id)),
                json!({ "settings": settings }),
            ))
            .await
    }

    pub async fn delete_instance(&self, region: ScwRegion, instance_id: &str) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::delete(Self::instance_path(region, instance_id)))
            .await
    }

    pub async fn list_databases(
        &self,
        region: ScwRegion,
        instance_id: &str,
        name: Option<&str>,
    ) -> ProviderResult<Vec<Database>> {
        let request = ApiRequest::get(format!("{}/databases", Self::instance_path(region, instance_id)))
            .with_optional_query("name", name);
        self.client.list_all(request, "databases").await
    }

    pub async fn create_database(&self, region: ScwRegion, instance_id: &str, name: &str) -> ProviderResult<Database> {
        self.client
            .send(ApiRequest::post(
                format!("{}/databases", Self::instance_path(region, instance_id)),
                json!({ "name": name }),
            ))
            .await
    }

    pub async fn delete_database(&self, region: ScwRegion, instance_id: &str, name: &str) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::delete(format!(
                "{}/databases/{}",
                Self::instance_path(region, instance_id),
                urlencoding::encode(name)
            )))
            .await
    }

    pub async fn list_users(&self, region: ScwRegion, instance_id: &str, name: Option<&str>) -> ProviderResult<Vec<User>> {
        let request = ApiRequest::get(format!("{}/users", Self::instance_path(region, instance_id)))
            .with_optional_query("name", name);
        self.client.list_all(request, "users").await
    }

    pub async fn create_user(
        &self,
        region: ScwRegion,
        instance_id: &str,
        name: &str,
        password: &str,
        is_admin: bool,
    ) -> ProviderResult<User> {
        self.client
            .send(ApiRequest::post(
                format!("{}/users", Self::instance_path(region, instance_id)),
                json!({ "name": name, "password": password, "is_admin": is_admin }),
            ))
            .await
    }

    pub async fn update_user(
        &self,
        region: ScwRegion,
        instance_id: &str,
        name: &str,
        password: Option<&str>,
        is_admin: Option<bool>,
    ) -> ProviderResult<User> {
        let mut body = serde_json::Map::new();
        if let Some(password) = password {
            body.insert("password".to_string(), json!(password));
        }
        if let Some(is_admin) = is_admin {
            body.insert("is_admin".to_string(), json!(is_admin));
        }

        self.client
            .send(ApiRequest::patch(
                format!(
                    "{}/users/{}",
                    Self::instance_path(region, instance_id),
                    urlencoding::encode(name)
                ),
                serde_json::Value::Object(body),
            ))
            .await
    }

    pub async fn delete_user(&self, region: ScwRegion, instance_id: &str, name: &str) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::delete(format!(
                "{}/users/{}",
                Self::instance_path(region, instance_id),
                urlencoding::encode(name)
            )))
            .await
    }

    pub async fn list_privileges(
        &self,
        region: ScwRegion,
        instance_id: &str,
        database_name: Option<&str>,
        user_name: Option<&str>,
    ) -> ProviderResult<Vec<Privilege>> {
        let request = ApiRequest::get(format!("{}/privileges", Self::instance_path(region, instance_id)))
            .with_optional_query("database_name", database_name)
            .with_optional_query("user_name", user_name);
        self.client.list_all(request, "privileges").await
    }

    pub async fn set_privilege(
        &self,
        region: ScwRegion,
        instance_id: &str,
        database_name: &str,
        user_name: &str,
        permission: Permission,
    ) -> ProviderResult<Privilege> {
        self.client
            .send(ApiRequest::put(
                format!("{}/privileges", Self::instance_path(region, instance_id)),
                json!({ "database_name": database_name, "user_name": user_name, "permission": permission }),
            ))
            .await
    }

    pub async fn list_acl_rules(&self, region: ScwRegion, instance_id: &str) -> ProviderResult<Vec<AclRule>> {
        self.client
            .list_all(
                ApiRequest::get(format!("{}/acls", Self::instance_path(region, instance_id))),
                "rules",
            )
            .await
    }

    /// Replaces the whole rule set.
    pub async fn set_acl_rules(
        &self,
        region: ScwRegion,
        instance_id: &str,
        rules: &[AclRule],
    ) -> ProviderResult<Vec<AclRule>> {
        #[derive(Deserialize)]
        struct SetAclRulesResponse {
            rules: Vec<AclRule>,
        }

        let res: SetAclRulesResponse = self
            .client
            .send(ApiRequest::put(
                format!("{}/acls", Self::instance_path(region, instance_id)),
                json!({ "rules": rules }),
            ))
            .await?;
        Ok(res.rules)
    }

    pub async fn delete_acl_rules(&self, region: ScwRegion, instance_id: &str, ips: &[String]) -> ProviderResult<()> {
        self.client
            .send_empty(
                ApiRequest::delete(format!("{}/acls", Self::instance_path(region, instance_id)))
                    .with_body(json!({ "acl_rule_ips": ips })),
            )
            .await
    }
}
