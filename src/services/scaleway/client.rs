use crate::constants::{AUTH_TOKEN_HEADER, DEFAULT_PAGE_SIZE};
use crate::errors::{ApiError, ProviderError, ProviderResult};
use async_trait::async_trait;
use derivative::Derivative;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::Display;
use url::Url;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

/// ApiRequest: one call to the Scaleway REST API, the scope is always part of `path`.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: String) -> Self {
        ApiRequest {
            method,
            path,
            query: vec![],
            body: None,
        }
    }

    pub fn get(path: String) -> Self {
        ApiRequest::new(Method::Get, path)
    }

    pub fn post(path: String, body: serde_json::Value) -> Self {
        ApiRequest::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: String, body: serde_json::Value) -> Self {
        ApiRequest::new(Method::Patch, path).with_body(body)
    }

    pub fn put(path: String, body: serde_json::Value) -> Self {
        ApiRequest::new(Method::Put, path).with_body(body)
    }

    pub fn delete(path: String) -> Self {
        ApiRequest::new(Method::Delete, path)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds the parameter only when set.
    pub fn with_optional_query(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.with_query(key, value),
            _ => self,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// ApiTransport: sends requests to the API. Empty responses are returned as `Null`.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError>;
}

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ReqwestTransport {
    #[derivative(Debug = "ignore")]
    http: reqwest::Client,
    api_url: Url,
    #[derivative(Debug = "ignore")]
    secret_key: String,
}

impl ReqwestTransport {
    pub fn new(api_url: &str, secret_key: &str) -> Result<Self, ApiError> {
        let mut api_url = Url::parse(api_url)
            .map_err(|e| ApiError::new_transport(&format!("invalid api url `{api_url}`: {e}")))?;
        // paths are joined relative to the base, a prefix such as `/scw` must end with a slash to be kept
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("qovery-scaleway-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::new_transport(&format!("cannot build http client: {e}")))?;

        Ok(ReqwestTransport {
            http,
            api_url,
            secret_key: secret_key.to_string(),
        })
    }

    /// Url of `path` under the configured api url.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::new_transport(&format!("invalid path `{path}`: {e}")))
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint(&request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, &self.secret_key)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("{} {}", request.method, request.path);
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::new_transport(&format!("{} {}: {}", request.method, request.path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::new_transport(&format!("cannot read response body: {e}")))?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| ApiError {
            status: Some(status.as_u16()),
            message: format!("invalid json response: {e}"),
            ..Default::default()
        })
    }
}

/// ScwClient: typed access on top of a transport, shared by every API.
#[derive(Clone)]
pub struct ScwClient {
    transport: Arc<dyn ApiTransport>,
}

impl ScwClient {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        ScwClient { transport }
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ProviderResult<T> {
        let path = request.path.clone();
        let json = self.transport.execute(request).await?;
        serde_json::from_value(json)
            .map_err(|e| ProviderError::new_internal(&format!("unexpected response from `{path}`: {e}")))
    }

    /// For calls whose response body is not needed.
    pub async fn send_empty(&self, request: ApiRequest) -> ProviderResult<()> {
        self.transport.execute(request).await?;
        Ok(())
    }

    /// Fetches every page of a list endpoint, `items_field` being the array holding the entities.
    pub async fn list_all<T: DeserializeOwned>(&self, request: ApiRequest, items_field: &str) -> ProviderResult<Vec<T>> {
        let mut items: Vec<T> = vec![];
        let mut page: u32 = 1;

        loop {
            let page_request = request
                .clone()
                .with_query("page", page)
                .with_query("page_size", DEFAULT_PAGE_SIZE);
            let mut json = self.transport.execute(page_request).await?;

            let total_count = json.get("total_count").and_then(|c| c.as_u64());
            let page_items: Vec<T> = match json.get_mut(items_field).map(serde_json::Value::take) {
                Some(page_items) => serde_json::from_value(page_items).map_err(|e| {
                    ProviderError::new_internal(&format!("unexpected `{items_field}` in `{}`: {e}", request.path))
                })?,
                None => vec![],
            };

            let received = page_items.len();
            items.extend(page_items);

            match total_count {
                Some(total) if (items.len() as u64) < total && received > 0 => page += 1,
                _ => return Ok(items),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_derive::Deserialize;
    use std::sync::Mutex;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Item {
        id: u32,
    }

    struct PagedTransport {
        total: u32,
        requests: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl ApiTransport for PagedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value, ApiError> {
            let page: u32 = request.query_value("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let page_size: u32 = request.query_value("page_size").and_then(|p| p.parse().ok()).unwrap_or(100);
            self.requests.lock().expect("lock").push(request);

            let first = (page - 1) * page_size;
            let items: Vec<serde_json::Value> = (first..self.total.min(first + page_size))
                .map(|id| serde_json::json!({ "id": id }))
                .collect();
            Ok(serde_json::json!({ "items": items, "total_count": self.total }))
        }
    }

    #[tokio::test]
    async fn test_list_all_follows_pages() {
        let transport = Arc::new(PagedTransport {
            total: 250,
            requests: Mutex::new(vec![]),
        });
        let client = ScwClient::new(transport.clone());

        let items: Vec<Item> = client
            .list_all(ApiRequest::get("/things".to_string()).with_query("name", "a"), "items")
            .await
            .expect("list should succeed");

        assert_eq!(250, items.len());
        assert_eq!(Some(&Item { id: 249 }), items.last());

        let requests = transport.requests.lock().expect("lock");
        assert_eq!(3, requests.len());
        assert!(requests.iter().all(|r| r.query_value("name") == Some("a")));
    }

    #[test]
    fn test_method_display() {
        assert_eq!("PATCH", Method::Patch.to_string());
    }

    #[test]
    fn test_transport_needs_a_valid_api_url() {
        assert!(ReqwestTransport::new("https://api.scaleway.com", "secret").is_ok());
        assert!(ReqwestTransport::new("api.scaleway.com", "secret").is_err());
    }

    #[test]
    fn test_transport_keeps_the_api_url_path() {
        struct TestCase<'a> {
            api_url: &'a str,
            expected: &'a str,
        }

        let test_cases = vec![
            TestCase {
                api_url: "https://api.scaleway.com",
                expected: "https://api.scaleway.com/registry/v1/regions/fr-par/namespaces",
            },
            TestCase {
                api_url: "https://proxy.internal/scw",
                expected: "https://proxy.internal/scw/registry/v1/regions/fr-par/namespaces",
            },
            TestCase {
                api_url: "https://proxy.internal/scw/",
                expected: "https://proxy.internal/scw/registry/v1/regions/fr-par/namespaces",
            },
        ];

        for tc in test_cases {
            let transport = ReqwestTransport::new(tc.api_url, "secret").expect("valid api url");
            let url = transport
                .endpoint("/registry/v1/regions/fr-par/namespaces")
                .expect("valid path");
            assert_eq!(tc.expected, url.as_str(), "api url: {}", tc.api_url);
        }
    }
}
