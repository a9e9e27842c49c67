use crate::errors::ProviderResult;
use crate::locality::ScwRegion;
use crate::reconcile::StatusClass;
use crate::services::scaleway::client::{ApiRequest, ScwClient};
use serde_derive::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq, Hash)]
pub enum NamespaceNamingRule {
    #[error("Max length reached, should be less or equal to {max_length}.")]
    MaxLengthReached { max_length: usize },
    #[error("Min length not reached, should be greater or equal to {min_length}.")]
    MinLengthNotReached { min_length: usize },
    #[error("Should be alpha numeric characters, dashes and periods.")]
    AlphaNumericCharsDashesPeriodsOnly,
}

pub fn check_namespace_naming_rules(name: &str) -> Option<HashSet<NamespaceNamingRule>> {
    let mut broken_rules = HashSet::new();

    if name.len() < 4 {
        broken_rules.insert(NamespaceNamingRule::MinLengthNotReached { min_length: 4 });
    }
    if name.len() > 50 {
        broken_rules.insert(NamespaceNamingRule::MaxLengthReached { max_length: 50 });
    }
    if !name.chars().all(|x| x.is_alphanumeric() || x == '-' || x == '.') {
        broken_rules.insert(NamespaceNamingRule::AlphaNumericCharsDashesPeriodsOnly);
    }

    match broken_rules.is_empty() {
        true => None,
        false => Some(broken_rules),
    }
}

/// Status of a namespace, unknown statuses are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum NamespaceStatus {
    Ready,
    Creating,
    Updating,
    Deleting,
    Error,
    Locked,
    Unknown(String),
}

impl NamespaceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NamespaceStatus::Ready => "ready",
            NamespaceStatus::Creating => "creating",
            NamespaceStatus::Updating => "updating",
            NamespaceStatus::Deleting => "deleting",
            NamespaceStatus::Error => "error",
            NamespaceStatus::Locked => "locked",
            NamespaceStatus::Unknown(status) => status.as_str(),
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            NamespaceStatus::Ready => StatusClass::TerminalOk,
            NamespaceStatus::Creating | NamespaceStatus::Updating | NamespaceStatus::Deleting => {
                StatusClass::Transitional
            }
            NamespaceStatus::Error | NamespaceStatus::Locked | NamespaceStatus::Unknown(_) => {
                StatusClass::TerminalBad(self.to_string())
            }
        }
    }
}

impl From<String> for NamespaceStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "ready" => NamespaceStatus::Ready,
            "creating" => NamespaceStatus::Creating,
            "updating" => NamespaceStatus::Updating,
            "deleting" => NamespaceStatus::Deleting,
            "error" => NamespaceStatus::Error,
            "locked" => NamespaceStatus::Locked,
            _ => NamespaceStatus::Unknown(status),
        }
    }
}

impl From<NamespaceStatus> for String {
    fn from(status: NamespaceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for NamespaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Namespace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project_id: String,
    pub status: NamespaceStatus,
    #[serde(default)]
    pub status_message: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub size: u64,
    pub region: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
    pub description: String,
    pub project_id: String,
    pub is_public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateNamespaceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Clone)]
pub struct RegistryApi {
    client: ScwClient,
}

impl RegistryApi {
    pub fn new(client: ScwClient) -> Self {
        RegistryApi { client }
    }

    fn namespaces_path(region: ScwRegion) -> String {
        format!("/registry/v1/regions/{region}/namespaces")
    }

    pub async fn list_namespaces(
        &self,
        region: ScwRegion,
        name: Option<&str>,
        project_id: Option<&str>,
    ) -> ProviderResult<Vec<Namespace>> {
        let request = ApiRequest::get(Self::namespaces_path(region))
            .with_optional_query("name", name)
            .with_optional_query("project_id", project_id);
        self.client.list_all(request, "namespaces").await
    }

    pub async fn create_namespace(
        &self,
        region: ScwRegion,
        request: &CreateNamespaceRequest,
    ) -> ProviderResult<Namespace> {
        self.client
            .send(ApiRequest::post(Self::namespaces_path(region), json!(request)))
            .await
    }

    pub async fn get_namespace(&self, region: ScwRegion, namespace_id: &str) -> ProviderResult<Namespace> {
        self.client
            .send(ApiRequest::get(format!(
                "{}/{}",
                Self::namespaces_path(region),
                namespace_id
            )))
            .await
    }

    pub async fn update_namespace(
        &self,
        region: ScwRegion,
        namespace_id: &str,
        request: &UpdateNamespaceRequest,
    ) -> ProviderResult<Namespace> {
        self.client
            .send(ApiRequest::patch(
                format!("{}/{}", Self::namespaces_path(region), namespace_id),
                json!(request),
            ))
            .await
    }

    pub async fn delete_namespace(&self, region: ScwRegion, namespace_id: &str) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::delete(format!(
                "{}/{}",
                Self::namespaces_path(region),
                namespace_id
            )))
            .await
    }
}
