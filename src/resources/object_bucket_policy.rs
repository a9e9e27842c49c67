use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{expand_region_and_name, new_scoped_id, parse_scoped_path};
use crate::marshalling::{ResourceData, normalize_policy_json, policy_equivalent};
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::{Resource, found, ignore_not_found, stored_id};
use crate::schema::{Attribute, Schema, suppress_equivalent_policy, suppress_locality_diff};
use async_trait::async_trait;

pub struct ObjectBucketPolicyResource;

impl ObjectBucketPolicyResource {
    async fn put(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, bucket) = expand_region_and_name(data.get_str("bucket").unwrap_or_default(), meta.region(data)?)?;
        let policy = data.get_str("policy").unwrap_or_default();
        let policy = normalize_policy_json(policy)
            .map_err(|e| ProviderError::new_validation("policy", &format!("policy is not a valid JSON document: {e}")))?;
        let storage = meta.object_storage();

        ctx.run(async {
            storage
                .put_bucket_policy(region, &bucket, &policy)
                .await
                .map_err(ProviderError::from)
        })
        .await?;
        data.set_id(new_scoped_id(region, &bucket));

        self.read(ctx, data, meta).await
    }
}

#[async_trait]
impl Resource for ObjectBucketPolicyResource {
    fn kind(&self) -> &'static str {
        "scaleway_object_bucket_policy"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "bucket",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute(
                "policy",
                Attribute::required_string().with_diff_suppress(suppress_equivalent_policy),
            )
            .with_attribute("region", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        self.put(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (scope, bucket) = parse_scoped_path(&stored_id(data)?)?;
        let region = scope.region();
        let storage = meta.object_storage();

        let policy = ctx
            .run(async { storage.get_bucket_policy(region, &bucket).await.map_err(ProviderError::from) })
            .await;
        let policy = match found(policy, data)? {
            Some(policy) => policy,
            None => return Ok(()),
        };

        // the user's text is kept as long as the cloud holds an equivalent document
        let keep_current = data
            .get_str("policy")
            .map(|current| policy_equivalent(current, &policy))
            .unwrap_or(false);
        if !keep_current {
            data.set("policy", normalize_policy_json(&policy).unwrap_or(policy));
        }
        if !suppress_locality_diff(data.get("bucket"), &bucket.as_str().into()) {
            data.set("bucket", bucket.as_str());
        }
        data.set("region", region.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        match self.schema().has_change(data, "policy") {
            true => self.put(ctx, data, meta).await,
            false => self.read(ctx, data, meta).await,
        }
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (scope, bucket) = parse_scoped_path(&stored_id(data)?)?;
        let region = scope.region();
        let storage = meta.object_storage();

        ignore_not_found(
            ctx.run(async { storage.delete_bucket_policy(region, &bucket).await.map_err(ProviderError::from) })
                .await,
        )?;

        data.clear_id();
        Ok(())
    }
}
