use crate::errors::{ProviderError, ProviderResult, Tag};
use crate::locality::new_scoped_id;
use crate::marshalling::{
    KeyValue, ResourceData, Value, expand_key_value_list, expand_optional_bool, expand_optional_i64,
    expand_optional_string, expand_string_list, flatten_key_value_list, flatten_optional_string, flatten_string_list,
};
use crate::provider::ProviderMeta;
use crate::reconcile::{
    OperationContext, StatusClass, default_wait_retry_interval, retry_on_conflict, wait_for_absence,
};
use crate::resources::documentdb::wait_for_instance;
use crate::resources::{Resource, found, ignore_not_found, parse_regional_id, stored_id};
use crate::schema::{Attribute, ResourceTimeouts, Schema};
use crate::services::scaleway::documentdb::{
    CreateInstanceRequest, Instance, InstanceSetting, InstanceUpgrade, UpdateInstanceRequest,
};
use crate::unit_conversion::{bytes_to_gb, gb_to_bytes};
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

pub struct DocumentDbInstanceResource;

fn to_settings(value: &Value) -> Vec<InstanceSetting> {
    expand_key_value_list(value)
        .into_iter()
        .map(InstanceSetting::from)
        .collect()
}

fn from_settings(settings: &[InstanceSetting]) -> Value {
    flatten_key_value_list(&settings.iter().map(KeyValue::from).collect::<Vec<KeyValue>>())
}

fn volume_size_in_bytes(data: &ResourceData) -> ProviderResult<Option<u64>> {
    match expand_optional_i64(data.get("volume_size_in_gb")) {
        Some(gb) => gb_to_bytes(gb as f64)
            .map(Some)
            .map_err(|e| ProviderError::new_validation("volume_size_in_gb", &e.to_string())),
        None => Ok(None),
    }
}

/// Checks the update can be done in place, before any call is issued.
fn validate_update(schema: &Schema, data: &ResourceData) -> ProviderResult<()> {
    if schema.has_change(data, "volume_size_in_gb") {
        if let (Some(old), Some(new)) = (data.old("volume_size_in_gb").as_i64(), data.get_i64("volume_size_in_gb")) {
            if new < old {
                return Err(ProviderError::new_validation(
                    "volume_size_in_gb",
                    "volume_size_in_gb cannot be decreased",
                ));
            }
        }
    }

    if schema.has_change(data, "is_ha_cluster")
        && data.old("is_ha_cluster").as_bool() == Some(true)
        && data.get_bool("is_ha_cluster") != Some(true)
    {
        return Err(ProviderError::new_validation(
            "is_ha_cluster",
            "is_ha_cluster cannot be disabled once enabled",
        ));
    }

    Ok(())
}

/// Upgrades to issue, in the order the API expects them.
fn upgrades(schema: &Schema, data: &ResourceData) -> ProviderResult<Vec<InstanceUpgrade>> {
    let mut upgrades = vec![];

    if schema.has_change(data, "node_type") {
        if let Some(node_type) = data.get_str("node_type") {
            upgrades.push(InstanceUpgrade::NodeType(node_type.to_string()));
        }
    }
    if schema.has_change(data, "is_ha_cluster") && data.get_bool("is_ha_cluster") == Some(true) {
        upgrades.push(InstanceUpgrade::EnableHa);
    }
    if schema.has_change(data, "volume_type") {
        if let Some(volume_type) = expand_optional_string(data.get("volume_type")) {
            upgrades.push(InstanceUpgrade::VolumeType(volume_type));
        }
    }
    if schema.has_change(data, "volume_size_in_gb") {
        if let Some(size) = volume_size_in_bytes(data)? {
            upgrades.push(InstanceUpgrade::VolumeSize(size));
        }
    }

    Ok(upgrades)
}

#[async_trait]
impl Resource for DocumentDbInstanceResource {
    fn kind(&self) -> &'static str {
        "scaleway_documentdb_instance"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::optional_computed_string().with_description("Name of the instance, generated when unset"),
            )
            .with_attribute("node_type", Attribute::required_string())
            .with_attribute("engine", Attribute::required_string().force_new())
            .with_attribute("user_name", Attribute::optional_string().force_new())
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Password of the initial user, changed through the users API"),
            )
            .with_attribute("is_ha_cluster", Attribute::optional_bool().with_default(false))
            .with_attribute("volume_type", Attribute::optional_computed_string())
            .with_attribute("volume_size_in_gb", Attribute::optional_computed_int())
            .with_attribute("tags", Attribute::optional_string_list())
            .with_attribute("settings", Attribute::optional_computed_string_map())
            .with_attribute("init_settings", Attribute::optional_string_map().force_new())
            .with_attribute("project_id", Attribute::optional_computed_string().force_new())
            .with_attribute("region", Attribute::optional_computed_string().force_new())
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("endpoint_ip", Attribute::computed_string())
            .with_attribute("endpoint_port", Attribute::computed_int())
    }

    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts {
            create: Duration::from_secs(15 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(15 * 60),
        }
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let api = &meta.documentdb();
        let region = meta.region(data)?;

        let request = CreateInstanceRequest {
            project_id: meta.project_id(data)?,
            name: data
                .get_str("name")
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("docdb-{}", Uuid::new_v4().simple())),
            engine: data.get_str("engine").unwrap_or_default().to_string(),
            user_name: data.get_str("user_name").unwrap_or_default().to_string(),
            password: data.get_str("password").unwrap_or_default().to_string(),
            node_type: data.get_str("node_type").unwrap_or_default().to_string(),
            is_ha_cluster: expand_optional_bool(data.get("is_ha_cluster")).unwrap_or(false),
            tags: expand_string_list(data.get("tags")),
            init_settings: to_settings(data.get("init_settings")),
            volume_type: expand_optional_string(data.get("volume_type")),
            volume_size: volume_size_in_bytes(data)?,
        };

        let instance = ctx.run(api.create_instance(region, &request)).await?;
        data.set_id(new_scoped_id(region, &instance.id));
        let instance_id = instance.id.as_str();
        info!("documentdb instance `{}` created, waiting for it to be ready", instance_id);

        wait_for_instance(ctx, api, region, instance_id).await?;

        let settings = to_settings(data.get("settings"));
        if !settings.is_empty() {
            let settings = &settings;
            retry_on_conflict(
                ctx,
                default_wait_retry_interval(),
                move || api.set_instance_settings(region, instance_id, settings),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
            wait_for_instance(ctx, api, region, instance_id).await?;
        }

        self.read(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, instance_id) = parse_regional_id(&stored_id(data)?)?;
        let api = meta.documentdb();

        let instance: Instance = match found(ctx.run(api.get_instance(region, &instance_id)).await, data)? {
            Some(instance) => instance,
            None => return Ok(()),
        };

        data.set("name", instance.name.as_str());
        data.set("node_type", instance.node_type.as_str());
        data.set("engine", instance.engine.as_str());
        data.set("is_ha_cluster", instance.is_ha_cluster);
        data.set("project_id", instance.project_id.as_str());
        data.set("region", region.as_str());
        data.set("status", instance.status.to_string());
        data.set("tags", flatten_string_list(&instance.tags));
        data.set("settings", from_settings(&instance.settings));
        if !instance.init_settings.is_empty() {
            data.set("init_settings", from_settings(&instance.init_settings));
        }
        if let Some(volume) = &instance.volume {
            data.set("volume_type", flatten_optional_string(Some(volume.volume_type.as_str())));
            data.set("volume_size_in_gb", bytes_to_gb(volume.size));
        }
        match instance.endpoints.first() {
            Some(endpoint) => {
                data.set("endpoint_ip", endpoint.ip.clone());
                data.set("endpoint_port", endpoint.port);
            }
            None => {
                data.set("endpoint_ip", Value::Null);
                data.set("endpoint_port", Value::Null);
            }
        }

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let schema = self.schema();
        validate_update(&schema, data)?;

        let (region, instance_id) = parse_regional_id(&stored_id(data)?)?;
        let api = &meta.documentdb();
        let instance_id = instance_id.as_str();
        let interval = default_wait_retry_interval();

        let mut request = UpdateInstanceRequest::default();
        if schema.has_change(data, "name") {
            request.name = data.get_str("name").map(|n| n.to_string());
        }
        if schema.has_change(data, "tags") {
            request.tags = Some(expand_string_list(data.get("tags")));
        }
        if !request.is_empty() {
            let request = &request;
            retry_on_conflict(
                ctx,
                interval,
                move || api.update_instance(region, instance_id, request),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
        }

        // the API refuses concurrent upgrades, one at a time
        for upgrade in upgrades(&schema, data)? {
            info!("upgrading documentdb instance `{}`: {:?}", instance_id, upgrade);
            let upgrade = &upgrade;
            retry_on_conflict(
                ctx,
                interval,
                move || api.upgrade_instance(region, instance_id, upgrade),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
            wait_for_instance(ctx, api, region, instance_id).await?;
        }

        if schema.has_change(data, "settings") {
            let settings = &to_settings(data.get("settings"));
            retry_on_conflict(
                ctx,
                interval,
                move || api.set_instance_settings(region, instance_id, settings),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
            wait_for_instance(ctx, api, region, instance_id).await?;
        }

        if schema.has_change(data, "password") {
            let user_name = data.get_str("user_name").ok_or_else(|| {
                ProviderError::new_validation("user_name", "user_name is required to change the password")
            })?;
            let password = data.get_str("password").unwrap_or_default();
            retry_on_conflict(
                ctx,
                interval,
                move || api.update_user(region, instance_id, user_name, Some(password), None),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await?;
            wait_for_instance(ctx, api, region, instance_id).await?;
        }

        self.read(ctx, data, meta).await
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, instance_id) = parse_regional_id(&stored_id(data)?)?;
        let api = &meta.documentdb();
        let instance_id = instance_id.as_str();
        let interval = default_wait_retry_interval();

        match wait_for_instance(ctx, api, region, instance_id).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            // an instance stuck in error can still be deleted
            Err(err) if err.tag() == Tag::BadTerminalState => {
                warn!("deleting documentdb instance `{}` in a bad state: {}", instance_id, err)
            }
            Err(err) => return Err(err),
        }

        ignore_not_found(
            retry_on_conflict(
                ctx,
                interval,
                move || api.delete_instance(region, instance_id),
                move || wait_for_instance(ctx, api, region, instance_id),
            )
            .await,
        )?;

        wait_for_absence(
            ctx,
            interval,
            move || api.get_instance(region, instance_id),
            |instance: &Instance| match instance.status.class() {
                // status of an instance being torn down is irrelevant
                StatusClass::TerminalBad(_) => StatusClass::Transitional,
                class => class,
            },
        )
        .await?;

        data.clear_id();
        Ok(())
    }
}
