//! HTTPS transport for the metadata endpoint.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};

use crate::{
    api::{MetadataApi, MetadataBody, MetadataResponse},
    defaults::MetadataConfig,
    error::NetworkError,
};

/// A simple wrapper on an HTTP client for making requests. Sets sensible defaults such as timeouts
/// and user-agent, and refuses to send anything but HTTPS.
pub struct Request {
    client: reqwest::Client,
    timeout: Duration,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("metadatakit-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    /// Creates a GET request builder with defaults applied.
    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.req(Method::GET, url)
    }

    /// Creates a PUT request builder with defaults applied.
    pub(crate) fn put(&self, url: &str) -> RequestBuilder {
        self.req(Method::PUT, url)
    }

    /// Sends a request and turns non-2xx statuses into [`NetworkError`]s.
    ///
    /// Non-HTTPS URLs fail with a transport error before anything is sent.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, NetworkError> {
        let (client, request) = request_builder.build_split();
        let request = request.map_err(|err| {
            NetworkError::transport(
                err.url()
                    .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
                format!("request build failed: {err}"),
            )
        })?;
        let url = request.url().to_string();

        if !cfg!(test) && request.url().scheme() != "https" {
            return Err(NetworkError::transport(url, "https required"));
        }

        let response = client
            .execute(request)
            .await
            .map_err(|err| NetworkError::transport(&url, format!("request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(NetworkError::with_status(
            url,
            status.as_u16(),
            format!("request error with bad status code {status}: {body}"),
        ))
    }
}

/// [`MetadataApi`] over HTTPS: `GET`/`PUT {base_url}/{address}`.
pub struct HttpMetadataApi {
    request: Request,
    base_url: String,
}

impl HttpMetadataApi {
    /// Builds the client from settings.
    #[must_use]
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            request: Request::new(config.request_timeout),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, address: &str) -> String {
        format!("{}/{address}", self.base_url)
    }
}

impl MetadataApi for HttpMetadataApi {
    async fn fetch_entry(&self, address: &str) -> Result<MetadataResponse, NetworkError> {
        let url = self.url(address);
        let response = self.request.handle(self.request.get(&url)).await?;
        response
            .json::<MetadataResponse>()
            .await
            .map_err(|err| NetworkError::transport(url, format!("invalid response body: {err}")))
    }

    async fn put_entry(&self, address: &str, body: &MetadataBody) -> Result<(), NetworkError> {
        let url = self.url(address);
        self.request
            .handle(self.request.put(&url).json(body))
            .await
            .map(|_| ())
    }
}
