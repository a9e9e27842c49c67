use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwRegion, ScwZone};
use crate::logger::{Logger, StdIoLogger};
use crate::marshalling::ResourceData;
use crate::provider::config::ProviderConfig;
use crate::services::scaleway::{
    ApiTransport, DocumentDbApi, InstanceApi, ObjectStorageApi, RegistryApi, ReqwestTransport, RusotoObjectStorage,
    ScwClient,
};
use std::str::FromStr;
use std::sync::Arc;

/// ProviderMeta: everything a handler needs besides its own resource data, shared by every invocation
/// of a session.
#[derive(Clone)]
pub struct ProviderMeta {
    config: ProviderConfig,
    client: ScwClient,
    object_storage: Arc<dyn ObjectStorageApi>,
    logger: Box<dyn Logger>,
}

impl ProviderMeta {
    pub fn new(
        config: ProviderConfig,
        transport: Arc<dyn ApiTransport>,
        object_storage: Arc<dyn ObjectStorageApi>,
        logger: Box<dyn Logger>,
    ) -> Self {
        ProviderMeta {
            config,
            client: ScwClient::new(transport),
            object_storage,
            logger,
        }
    }

    /// Meta talking to the real Scaleway endpoints.
    pub fn from_config(config: ProviderConfig) -> ProviderResult<Self> {
        let secret_key = config
            .secret_key
            .clone()
            .ok_or_else(|| ProviderError::new_invalid_configuration("The secret key is not set."))?;
        let access_key = config
            .access_key
            .clone()
            .ok_or_else(|| ProviderError::new_invalid_configuration("The access key is not set."))?;

        let transport = ReqwestTransport::new(&config.api_url, &secret_key)?;
        let object_storage = RusotoObjectStorage::new(&access_key, &secret_key);

        Ok(ProviderMeta::new(
            config,
            Arc::new(transport),
            Arc::new(object_storage),
            Box::new(StdIoLogger::new()),
        ))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn documentdb(&self) -> DocumentDbApi {
        DocumentDbApi::new(self.client.clone())
    }

    pub fn registry(&self) -> RegistryApi {
        RegistryApi::new(self.client.clone())
    }

    pub fn instance(&self) -> InstanceApi {
        InstanceApi::new(self.client.clone())
    }

    pub fn object_storage(&self) -> &dyn ObjectStorageApi {
        self.object_storage.as_ref()
    }

    /// `region` attribute of the resource, the provider default otherwise.
    pub fn region(&self, data: &ResourceData) -> ProviderResult<ScwRegion> {
        match data.get_str("region") {
            Some(region) => Ok(ScwRegion::from_str(region)?),
            None => Ok(self.config.default_region),
        }
    }

    /// `zone` attribute of the resource, the provider default otherwise.
    pub fn zone(&self, data: &ResourceData) -> ProviderResult<ScwZone> {
        match data.get_str("zone") {
            Some(zone) => Ok(ScwZone::from_str(zone)?),
            None => Ok(self.config.default_zone),
        }
    }

    /// `project_id` attribute of the resource, the provider default otherwise.
    pub fn project_id(&self, data: &ResourceData) -> ProviderResult<String> {
        data.get_str("project_id")
            .map(|p| p.to_string())
            .or_else(|| self.config.default_project_id.clone())
            .ok_or_else(|| {
                ProviderError::new_validation(
                    "project_id",
                    "project_id is not set on the resource and no default project is configured",
                )
            })
    }
}
