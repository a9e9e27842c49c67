use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwZone, is_uuid, new_scoped_id};
use crate::marshalling::{ResourceData, expand_blocks, flatten_blocks};
use crate::provider::ProviderMeta;
use crate::reconcile::{OperationContext, lock_legacy_api};
use crate::resources::{Resource, found, ignore_not_found, parse_zonal_id, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use crate::services::scaleway::instance::SecurityGroupRule;
use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};

const INBOUND: &str = "inbound";
const OUTBOUND: &str = "outbound";

/// One rule as declared by the user, its position is its index in the list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleBlock {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_ip_range")]
    pub ip_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
}

fn default_action() -> String {
    "accept".to_string()
}

fn default_protocol() -> String {
    "TCP".to_string()
}

fn default_ip_range() -> String {
    "0.0.0.0/0".to_string()
}

/// Inbound rules first, then outbound ones, positions follow the declaration order.
fn to_rules(inbound: &[RuleBlock], outbound: &[RuleBlock]) -> Vec<SecurityGroupRule> {
    inbound
        .iter()
        .map(|block| (INBOUND, block))
        .chain(outbound.iter().map(|block| (OUTBOUND, block)))
        .enumerate()
        .map(|(index, (direction, block))| SecurityGroupRule {
            id: None,
            protocol: block.protocol.clone(),
            direction: direction.to_string(),
            action: block.action.clone(),
            ip_range: block.ip_range.clone(),
            dest_port_from: block.port,
            dest_port_to: None,
            position: index as u32 + 1,
            editable: true,
        })
        .collect()
}

/// Editable rules of `direction`, in position order. Rules managed by the cloud are skipped.
fn to_blocks(rules: &[SecurityGroupRule], direction: &str) -> Vec<RuleBlock> {
    let mut rules: Vec<&SecurityGroupRule> = rules
        .iter()
        .filter(|r| r.editable && r.direction == direction)
        .collect();
    rules.sort_by_key(|r| r.position);

    rules
        .into_iter()
        .map(|r| RuleBlock {
            action: r.action.clone(),
            protocol: r.protocol.clone(),
            ip_range: r.ip_range.clone(),
            port: r.dest_port_from,
        })
        .collect()
}

/// Security group rules, shipped as a whole through the legacy instance API.
pub struct InstanceSecurityGroupRulesResource;

impl InstanceSecurityGroupRulesResource {
    fn security_group_locality(data: &ResourceData, meta: &ProviderMeta) -> ProviderResult<(ScwZone, String)> {
        let raw = data.get_str("security_group_id").ok_or_else(|| {
            ProviderError::new_validation("security_group_id", "security_group_id is required")
        })?;

        match is_uuid(raw) {
            true => Ok((meta.zone(data)?, raw.to_string())),
            false => parse_zonal_id(raw),
        }
    }

    async fn set(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (zone, security_group_id) = Self::security_group_locality(data, meta)?;
        let inbound = expand_blocks::<RuleBlock>("inbound_rule", data.get("inbound_rule"))?;
        let outbound = expand_blocks::<RuleBlock>("outbound_rule", data.get("outbound_rule"))?;
        let rules = to_rules(&inbound, &outbound);

        {
            let _lock = lock_legacy_api(ctx).await?;
            ctx.run(meta.instance().set_security_group_rules(zone, &security_group_id, &rules))
                .await?;
        }
        data.set_id(new_scoped_id(zone, &security_group_id));

        self.read(ctx, data, meta).await
    }
}

#[async_trait]
impl Resource for InstanceSecurityGroupRulesResource {
    fn kind(&self) -> &'static str {
        "scaleway_instance_security_group_rules"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "security_group_id",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute(
                "inbound_rule",
                Attribute::optional_blocks().with_description("Ordered list of `{action, protocol, ip_range, port}`"),
            )
            .with_attribute(
                "outbound_rule",
                Attribute::optional_blocks().with_description("Ordered list of `{action, protocol, ip_range, port}`"),
            )
            .with_attribute("zone", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.set(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let raw_id = stored_id(data)?;
        let (zone, security_group_id) = parse_zonal_id(&raw_id)?;

        let rules = {
            let _lock = lock_legacy_api(ctx).await?;
            ctx.run(meta.instance().list_security_group_rules(zone, &security_group_id))
                .await
        };
        let rules = match found(rules, data)? {
            Some(rules) => rules,
            None => return Ok(()),
        };

        data.set("security_group_id", raw_id.as_str());
        data.set("inbound_rule", flatten_blocks(&to_blocks(&rules, INBOUND))?);
        data.set("outbound_rule", flatten_blocks(&to_blocks(&rules, OUTBOUND))?);
        data.set("zone", zone.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        match data.has_changes(&["inbound_rule", "outbound_rule"]) {
            true => self.set(ctx, data, meta).await,
            false => self.read(ctx, data, meta).await,
        }
    }

    /// Removes every editable rule, the group itself is left untouched.
    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (zone, security_group_id) = parse_zonal_id(&stored_id(data)?)?;

        {
            let _lock = lock_legacy_api(ctx).await?;
            ignore_not_found(
                ctx.run(meta.instance().set_security_group_rules(zone, &security_group_id, &[]))
                    .await
                    .map(|_| ()),
            )?;
        }

        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(protocol: &str, port: Option<u32>) -> RuleBlock {
        RuleBlock {
            action: default_action(),
            protocol: protocol.to_string(),
            ip_range: default_ip_range(),
            port,
        }
    }

    #[test]
    fn test_rules_keep_declaration_order() {
        // setup:
        let inbound = vec![block("TCP", Some(443)), block("TCP", Some(22)), block("UDP", Some(53))];
        let outbound = vec![block("ANY", None)];

        // execute:
        let mut rules = to_rules(&inbound, &outbound);
        rules.push(SecurityGroupRule {
            id: Some("managed".to_string()),
            protocol: "TCP".to_string(),
            direction: INBOUND.to_string(),
            action: "drop".to_string(),
            ip_range: "0.0.0.0/0".to_string(),
            dest_port_from: Some(25),
            dest_port_to: None,
            position: 0,
            editable: false,
        });
        rules.reverse();

        // verify:
        assert_eq!(inbound, to_blocks(&rules, INBOUND));
        assert_eq!(outbound, to_blocks(&rules, OUTBOUND));
    }

    #[test]
    fn test_rule_block_defaults() {
        let block: RuleBlock = serde_json::from_value(serde_json::json!({ "port": 80 })).expect("valid block");

        assert_eq!("accept", block.action);
        assert_eq!("TCP", block.protocol);
        assert_eq!("0.0.0.0/0", block.ip_range);
    }
}
