use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwRegion, expand_region_and_name, new_scoped_id, parse_scoped_path};
use crate::marshalling::{
    ResourceData, expand_optional_string, expand_string_map, flatten_optional_string, flatten_string_map,
};
use crate::provider::ProviderMeta;
use crate::reconcile::OperationContext;
use crate::resources::{Resource, found, ignore_not_found, stored_id};
use crate::schema::{Attribute, Schema, suppress_locality_diff};
use crate::services::scaleway::object_storage::{
    CopyObjectInPlace, PRIVATE_ACL, PUBLIC_READ_ACL, PutObject, visibility_from_grants,
};
use async_trait::async_trait;

/// Attributes whose change requires the body to be uploaded again.
const CONTENT_ATTRIBUTES: &[&str] = &["file", "content", "hash"];
/// Attributes only carried by the object metadata, changed with a server side copy.
const METADATA_ATTRIBUTES: &[&str] = &["metadata", "content_type", "storage_class"];

pub struct ObjectResource;

/// Region, bucket and key out of `REGION/BUCKET/KEY`, the key may contain slashes.
fn parse_object_id(raw: &str) -> ProviderResult<(ScwRegion, String, String)> {
    let (scope, path) = parse_scoped_path(raw)?;
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((scope.region(), bucket.to_string(), key.to_string()))
        }
        _ => Err(ProviderError::new_invalid_id(raw, "expected REGION/BUCKET/KEY")),
    }
}

fn visibility(data: &ResourceData) -> ProviderResult<String> {
    match data.get_str("visibility").unwrap_or(PRIVATE_ACL) {
        v @ (PRIVATE_ACL | PUBLIC_READ_ACL) => Ok(v.to_string()),
        v => Err(ProviderError::new_validation(
            "visibility",
            &format!("visibility `{v}` is not one of {PRIVATE_ACL}, {PUBLIC_READ_ACL}"),
        )),
    }
}

async fn body(data: &ResourceData) -> ProviderResult<Vec<u8>> {
    match (data.get_str("file"), data.get_str("content")) {
        (Some(_), Some(_)) => Err(ProviderError::new_validation(
            "file",
            "file and content cannot be set together",
        )),
        (Some(path), None) => tokio::fs::read(path)
            .await
            .map_err(|e| ProviderError::new_validation("file", &format!("cannot read file `{path}`: {e}"))),
        (None, Some(content)) => Ok(content.as_bytes().to_vec()),
        (None, None) => Ok(vec![]),
    }
}

impl ObjectResource {
    async fn upload(
        &self,
        data: &ResourceData,
        meta: &ProviderMeta,
        ctx: &OperationContext,
        region: ScwRegion,
        bucket: &str,
        key: &str,
    ) -> ProviderResult<()> {
        let request = PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body(data).await?,
            content_type: expand_optional_string(data.get("content_type")),
            metadata: expand_string_map(data.get("metadata")),
            storage_class: expand_optional_string(data.get("storage_class")),
            tags: expand_string_map(data.get("tags")),
            acl: Some(visibility(data)?),
        };

        ctx.run(async { meta.object_storage().put_object(region, request).await.map_err(ProviderError::from) })
            .await
    }
}

#[async_trait]
impl Resource for ObjectResource {
    fn kind(&self) -> &'static str {
        "scaleway_object"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "bucket",
                Attribute::required_string()
                    .force_new()
                    .with_diff_suppress(suppress_locality_diff),
            )
            .with_attribute("key", Attribute::required_string().force_new())
            .with_attribute("file", Attribute::optional_string().with_description("Path of the file to upload"))
            .with_attribute("content", Attribute::optional_string())
            .with_attribute(
                "hash",
                Attribute::optional_string().with_description("Changing it uploads the content again"),
            )
            .with_attribute("content_type", Attribute::optional_computed_string())
            .with_attribute("metadata", Attribute::optional_string_map())
            .with_attribute("tags", Attribute::optional_string_map())
            .with_attribute("storage_class", Attribute::optional_computed_string())
            .with_attribute("visibility", Attribute::optional_computed_string())
            .with_attribute("region", Attribute::optional_computed_string().force_new())
    }

    async fn create(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, bucket) = expand_region_and_name(data.get_str("bucket").unwrap_or_default(), meta.region(data)?)?;
        let key = data.get_str("key").unwrap_or_default().to_string();

        self.upload(data, meta, ctx, region, &bucket, &key).await?;
        data.set_id(new_scoped_id(region, &format!("{bucket}/{key}")));

        self.read(ctx, data, meta).await
    }

    async fn read(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, bucket, key) = parse_object_id(&stored_id(data)?)?;
        let storage = meta.object_storage();

        let head = ctx
            .run(async { storage.head_object(region, &bucket, &key).await.map_err(ProviderError::from) })
            .await;
        let head = match found(head, data)? {
            Some(head) => head,
            None => return Ok(()),
        };
        let tags = ctx
            .run(async { storage.get_object_tagging(region, &bucket, &key).await.map_err(ProviderError::from) })
            .await?;
        let grants = ctx
            .run(async { storage.get_object_acl(region, &bucket, &key).await.map_err(ProviderError::from) })
            .await?;

        // the user may have given the bucket with its region
        if !suppress_locality_diff(data.get("bucket"), &bucket.as_str().into()) {
            data.set("bucket", bucket.as_str());
        }
        data.set("key", key.as_str());
        data.set("content_type", flatten_optional_string(head.content_type.as_deref()));
        data.set("metadata", flatten_string_map(&head.metadata));
        data.set("tags", flatten_string_map(&tags));
        data.set("storage_class", flatten_optional_string(head.storage_class.as_deref()));
        data.set("visibility", visibility_from_grants(&grants));
        data.set("region", region.as_str());

        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, bucket, key) = parse_object_id(&stored_id(data)?)?;
        let storage = meta.object_storage();

        if data.has_changes(CONTENT_ATTRIBUTES) {
            // the upload carries metadata, tags and visibility as well
            self.upload(data, meta, ctx, region, &bucket, &key).await?;
            return self.read(ctx, data, meta).await;
        }

        if data.has_changes(METADATA_ATTRIBUTES) {
            let request = CopyObjectInPlace {
                bucket: bucket.clone(),
                key: key.clone(),
                content_type: expand_optional_string(data.get("content_type")),
                metadata: expand_string_map(data.get("metadata")),
                storage_class: expand_optional_string(data.get("storage_class")),
            };
            ctx.run(async { storage.copy_object_in_place(region, request).await.map_err(ProviderError::from) })
                .await?;
        }

        if data.has_change("tags") {
            let tags = expand_string_map(data.get("tags"));
            ctx.run(async { storage.put_object_tagging(region, &bucket, &key, &tags).await.map_err(ProviderError::from) })
                .await?;
        }

        if data.has_change("visibility") {
            let acl = visibility(data)?;
            ctx.run(async { storage.put_object_acl(region, &bucket, &key, &acl).await.map_err(ProviderError::from) })
                .await?;
        }

        self.read(ctx, data, meta).await
    }

    async fn delete(&self, ctx: &OperationContext, data: &mut ResourceData, meta: &ProviderMeta) -> ProviderResult<()> {
        let (region, bucket, key) = parse_object_id(&stored_id(data)?)?;
        let storage = meta.object_storage();

        ignore_not_found(
            ctx.run(async { storage.delete_object(region, &bucket, &key).await.map_err(ProviderError::from) })
                .await,
        )?;

        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Tag;

    #[test]
    fn test_parse_object_id() {
        assert_eq!(
            (ScwRegion::Paris, "bucket".to_string(), "dir/file.txt".to_string()),
            parse_object_id("fr-par/bucket/dir/file.txt").expect("valid id")
        );
        assert_eq!(
            Tag::InvalidId,
            parse_object_id("fr-par/bucket").expect_err("no key").tag()
        );
    }
}
