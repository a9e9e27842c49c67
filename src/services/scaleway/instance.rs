use crate::errors::ProviderResult;
use crate::locality::ScwZone;
use crate::services::scaleway::client::{ApiRequest, ScwClient};
use serde_derive::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub project: String,
    /// Group created with the project, it can't be deleted.
    #[serde(default)]
    pub project_default: bool,
    #[serde(default)]
    pub stateful: bool,
    pub zone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecurityGroupRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// TCP, UDP, ICMP or ANY
    pub protocol: String,
    /// inbound or outbound
    pub direction: String,
    /// accept or drop
    pub action: String,
    pub ip_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port_from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port_to: Option<u32>,
    pub position: u32,
    /// Rules managed by the cloud are not editable.
    #[serde(default = "default_editable")]
    pub editable: bool,
}

fn default_editable() -> bool {
    true
}

#[derive(Clone)]
pub struct InstanceApi {
    client: ScwClient,
}

impl InstanceApi {
    pub fn new(client: ScwClient) -> Self {
        InstanceApi { client }
    }

    fn security_groups_path(zone: ScwZone) -> String {
        format!("/instance/v1/zones/{zone}/security_groups")
    }

    pub async fn list_security_groups(
        &self,
        zone: ScwZone,
        name: Option<&str>,
        project_id: Option<&str>,
    ) -> ProviderResult<Vec<SecurityGroup>> {
        let request = ApiRequest::get(Self::security_groups_path(zone))
            .with_optional_query("name", name)
            .with_optional_query("project", project_id);
        self.client.list_all(request, "security_groups").await
    }

    pub async fn get_security_group(&self, zone: ScwZone, security_group_id: &str) -> ProviderResult<SecurityGroup> {
        #[derive(Deserialize)]
        struct GetSecurityGroupResponse {
            security_group: SecurityGroup,
        }

        let res: GetSecurityGroupResponse = self
            .client
            .send(ApiRequest::get(format!(
                "{}/{}",
                Self::security_groups_path(zone),
                security_group_id
            )))
            .await?;
        Ok(res.security_group)
    }

    pub async fn delete_security_group(&self, zone: ScwZone, security_group_id: &str) -> ProviderResult<()> {
        self.client
            .send_empty(ApiRequest::delete(format!(
                "{}/{}",
                Self::security_groups_path(zone),
                security_group_id
            )))
            .await
    }

    /// Rules sorted by position.
    pub async fn list_security_group_rules(
        &self,
        zone: ScwZone,
        security_group_id: &str,
    ) -> ProviderResult<Vec<SecurityGroupRule>> {
        let mut rules: Vec<SecurityGroupRule> = self
            .client
            .list_all(
                ApiRequest::get(format!(
                    "{}/{}/rules",
                    Self::security_groups_path(zone),
                    security_group_id
                )),
                "rules",
            )
            .await?;
        rules.sort_by_key(|r| r.position);
        Ok(rules)
    }

    /// Replaces every editable rule of the group with `rules`, in that order.
    pub async fn set_security_group_rules(
        &self,
        zone: ScwZone,
        security_group_id: &str,
        rules: &[SecurityGroupRule],
    ) -> ProviderResult<Vec<SecurityGroupRule>> {
        #[derive(Deserialize)]
        struct SetSecurityGroupRulesResponse {
            #[serde(default)]
            rules: Vec<SecurityGroupRule>,
        }

        let res: SetSecurityGroupRulesResponse = self
            .client
            .send(ApiRequest::put(
                format!("{}/{}/rules", Self::security_groups_path(zone), security_group_id),
                json!({ "rules": rules }),
            ))
            .await?;
        Ok(res.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_editable_defaults_to_true() {
        let rule: SecurityGroupRule = serde_json::from_value(json!({
            "protocol": "TCP",
            "direction": "inbound",
            "action": "accept",
            "ip_range": "0.0.0.0/0",
            "dest_port_from": 22,
            "position": 1,
        }))
        .expect("valid rule");

        assert!(rule.editable);
        assert_eq!(None, rule.dest_port_to);
    }
}
