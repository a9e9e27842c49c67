use crate::errors::ApiError;
use crate::locality::ScwRegion;
use async_trait::async_trait;
use derivative::Derivative;
use itertools::Itertools;
use rusoto_core::{Client, HttpClient, Region as RusotoRegion, RusotoError};
use rusoto_credential::StaticProvider;
use rusoto_s3::{
    CopyObjectRequest, DeleteBucketPolicyRequest, DeleteObjectRequest, GetBucketPolicyRequest, GetObjectAclRequest,
    GetObjectTaggingRequest, HeadObjectRequest, PutBucketPolicyRequest, PutObjectAclRequest, PutObjectRequest,
    PutObjectTaggingRequest, S3, S3Client, StreamingBody, Tag, Tagging,
};
use std::collections::{BTreeMap, HashMap};

pub const ALL_USERS_GROUP_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
pub const PRIVATE_ACL: &str = "private";
pub const PUBLIC_READ_ACL: &str = "public-read";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub storage_class: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// canned ACL
    pub acl: Option<String>,
}

/// Server side copy of an object onto itself, replacing its metadata. The body is not transferred.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CopyObjectInPlace {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub storage_class: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectHead {
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub storage_class: Option<String>,
    pub etag: Option<String>,
    pub content_length: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub grantee_uri: Option<String>,
    pub grantee_id: Option<String>,
    /// READ, WRITE, FULL_CONTROL...
    pub permission: String,
}

/// `public-read` when everybody is granted read access, `private` otherwise.
pub fn visibility_from_grants(grants: &[Grant]) -> &'static str {
    let is_public = grants.iter().any(|g| {
        g.grantee_uri.as_deref() == Some(ALL_USERS_GROUP_URI) && (g.permission == "READ" || g.permission == "FULL_CONTROL")
    });

    match is_public {
        true => PUBLIC_READ_ACL,
        false => PRIVATE_ACL,
    }
}

/// ObjectStorageApi: S3 compatible object storage of a region.
#[async_trait]
pub trait ObjectStorageApi: Send + Sync {
    async fn put_object(&self, region: ScwRegion, request: PutObject) -> Result<(), ApiError>;
    async fn copy_object_in_place(&self, region: ScwRegion, request: CopyObjectInPlace) -> Result<(), ApiError>;
    async fn head_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<ObjectHead, ApiError>;
    async fn get_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError>;
    async fn put_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError>;
    async fn get_object_acl(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<Vec<Grant>, ApiError>;
    async fn put_object_acl(&self, region: ScwRegion, bucket: &str, key: &str, canned_acl: &str)
    -> Result<(), ApiError>;
    async fn delete_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<(), ApiError>;
    async fn get_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<String, ApiError>;
    async fn put_bucket_policy(&self, region: ScwRegion, bucket: &str, policy: &str) -> Result<(), ApiError>;
    async fn delete_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<(), ApiError>;
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct RusotoObjectStorage {
    access_key: String,
    #[derivative(Debug = "ignore")]
    secret_key: String,
}

impl RusotoObjectStorage {
    pub fn new(access_key: &str, secret_key: &str) -> Self {
        RusotoObjectStorage {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn get_s3_client(&self, region: ScwRegion) -> Result<S3Client, ApiError> {
        let rusoto_region = RusotoRegion::Custom {
            name: region.to_string(),
            endpoint: region.object_storage_endpoint(),
        };
        let http_client =
            HttpClient::new().map_err(|e| ApiError::new_transport(&format!("cannot build s3 http client: {e}")))?;
        let client = Client::new_with(self.get_credentials(), http_client);

        Ok(S3Client::new_with_client(client, rusoto_region))
    }

    fn get_credentials(&self) -> StaticProvider {
        StaticProvider::new(self.access_key.clone(), self.secret_key.clone(), None, None)
    }
}

fn to_hash_map(map: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    match map.is_empty() {
        true => None,
        false => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
    }
}

fn to_tagging_query(tags: &BTreeMap<String, String>) -> Option<String> {
    match tags.is_empty() {
        true => None,
        false => Some(
            tags.iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .join("&"),
        ),
    }
}

/// Extracts `<Code>` out of an S3 XML error document.
fn s3_error_code(body: &str) -> Option<String> {
    body.split_once("<Code>")
        .and_then(|(_, rest)| rest.split_once("</Code>"))
        .map(|(code, _)| code.trim().to_string())
}

fn to_api_error<E: std::error::Error + 'static>(err: RusotoError<E>) -> ApiError {
    match err {
        RusotoError::Service(e) => {
            // typed service errors only exist for missing keys and buckets
            let message = format!("{e:?}");
            let status = match message.starts_with("NoSuch") {
                true => 404,
                false => 400,
            };
            ApiError::new(status, None, &message)
        }
        RusotoError::Unknown(response) => {
            let body = response.body_as_str().to_string();
            ApiError::new(response.status.as_u16(), s3_error_code(&body).as_deref(), &body)
        }
        RusotoError::HttpDispatch(e) => ApiError::new_transport(&e.to_string()),
        RusotoError::Credentials(e) => ApiError::new(401, Some("denied_authentication"), &e.to_string()),
        RusotoError::Validation(message) => ApiError::new(400, Some("invalid_arguments"), &message),
        RusotoError::ParseError(message) => ApiError::new_transport(&format!("cannot parse s3 response: {message}")),
        RusotoError::Blocking => ApiError::new_transport("blocking s3 call failed"),
    }
}

#[async_trait]
impl ObjectStorageApi for RusotoObjectStorage {
    async fn put_object(&self, region: ScwRegion, request: PutObject) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .put_object(PutObjectRequest {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                body: Some(StreamingBody::from(request.body)),
                content_type: request.content_type,
                metadata: to_hash_map(&request.metadata),
                storage_class: request.storage_class,
                tagging: to_tagging_query(&request.tags),
                acl: request.acl,
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn copy_object_in_place(&self, region: ScwRegion, request: CopyObjectInPlace) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .copy_object(CopyObjectRequest {
                copy_source: format!("{}/{}", request.bucket, urlencoding::encode(&request.key)),
                bucket: request.bucket,
                key: request.key,
                metadata_directive: Some("REPLACE".to_string()),
                content_type: request.content_type,
                metadata: to_hash_map(&request.metadata),
                storage_class: request.storage_class,
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn head_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<ObjectHead, ApiError> {
        let s3_client = self.get_s3_client(region)?;
        let output = s3_client
            .head_object(HeadObjectRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;

        Ok(ObjectHead {
            content_type: output.content_type,
            metadata: output.metadata.unwrap_or_default().into_iter().collect(),
            storage_class: output.storage_class,
            etag: output.e_tag,
            content_length: output.content_length,
        })
    }

    async fn get_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let s3_client = self.get_s3_client(region)?;
        let output = s3_client
            .get_object_tagging(GetObjectTaggingRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;

        Ok(output.tag_set.into_iter().map(|t| (t.key, t.value)).collect())
    }

    async fn put_object_tagging(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .put_object_tagging(PutObjectTaggingRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                tagging: Tagging {
                    tag_set: tags
                        .iter()
                        .map(|(k, v)| Tag {
                            key: k.clone(),
                            value: v.clone(),
                        })
                        .collect(),
                },
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn get_object_acl(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<Vec<Grant>, ApiError> {
        let s3_client = self.get_s3_client(region)?;
        let output = s3_client
            .get_object_acl(GetObjectAclRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;

        Ok(output
            .grants
            .unwrap_or_default()
            .into_iter()
            .map(|g| Grant {
                grantee_uri: g.grantee.as_ref().and_then(|grantee| grantee.uri.clone()),
                grantee_id: g.grantee.as_ref().and_then(|grantee| grantee.id.clone()),
                permission: g.permission.unwrap_or_default(),
            })
            .collect())
    }

    async fn put_object_acl(
        &self,
        region: ScwRegion,
        bucket: &str,
        key: &str,
        canned_acl: &str,
    ) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .put_object_acl(PutObjectAclRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                acl: Some(canned_acl.to_string()),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn delete_object(&self, region: ScwRegion, bucket: &str, key: &str) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .delete_object(DeleteObjectRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn get_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<String, ApiError> {
        let s3_client = self.get_s3_client(region)?;
        let output = s3_client
            .get_bucket_policy(GetBucketPolicyRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;

        output
            .policy
            .ok_or_else(|| ApiError::new(404, Some("NoSuchBucketPolicy"), "bucket has no policy"))
    }

    async fn put_bucket_policy(&self, region: ScwRegion, bucket: &str, policy: &str) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .put_bucket_policy(PutBucketPolicyRequest {
                bucket: bucket.to_string(),
                policy: policy.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }

    async fn delete_bucket_policy(&self, region: ScwRegion, bucket: &str) -> Result<(), ApiError> {
        let s3_client = self.get_s3_client(region)?;
        s3_client
            .delete_bucket_policy(DeleteBucketPolicyRequest {
                bucket: bucket.to_string(),
                ..Default::default()
            })
            .await
            .map_err(to_api_error)?;
        Ok(())
    }
}
