use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};
use url::Url;

use crate::chat::ChatConfig;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ErrorBody, GenerateContentRequest, GenerateContentResponse, Model};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The environment variable the API key is read from by default.
pub const API_KEY_ENV: &str = "API_KEY";

/// Substituted for a missing API key.  The client accepts it, but session
/// creation rejects it, so the failure surfaces where the session is built.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_PLACEHOLDER";

/// A boxed stream of response chunks.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// Resolve the API key from an explicit value or the named environment variable.
///
/// A missing or blank key is logged as a warning and replaced with
/// [`PLACEHOLDER_API_KEY`]; this never fails.
pub fn resolve_api_key(explicit: Option<String>, env_var: &str) -> String {
    if let Some(key) = explicit {
        return key;
    }
    match env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::warn!(
                env_var,
                "API key environment variable not set; using a placeholder key"
            );
            PLACEHOLDER_API_KEY.to_string()
        }
    }
}

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: String,
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the `API_KEY`
    /// environment variable.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    ///
    /// Without a `timeout` a request may stream for as long as the server
    /// keeps the connection open; only connection setup is bounded.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(api_key, API_KEY_ENV);

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)?;

        let mut builder = ReqwestClient::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    /// Create a client from chat configuration.
    ///
    /// A missing key is not an error here; it is replaced by a placeholder
    /// that session creation rejects.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let api_key = resolve_api_key(config.api_key.clone(), &config.api_key_env);
        Self::with_options(Some(api_key), config.base_url.clone(), config.timeout)
    }

    /// The base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Verify the API key can authenticate a request.
    ///
    /// This is a local check: the placeholder, blank keys, and keys that
    /// cannot be sent as a header value are rejected.
    pub fn check_credential(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::authentication("API key is empty"));
        }
        if self.api_key == PLACEHOLDER_API_KEY {
            return Err(Error::authentication(format!(
                "API key not provided; set the {API_KEY_ENV} environment variable"
            )));
        }
        HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;
        Ok(())
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::authentication("API key contains invalid characters"))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    /// Build the URL for a model method such as `generateContent`.
    fn endpoint(&self, model: &Model, method: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("models/{}:{method}", model.as_str()))?)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ErrorBody>(&error_body) {
            Ok(parsed) => parsed
                .error
                .into_error(status_code, &error_body, retry_after),
            Err(_) => crate::types::ErrorDetail::default().into_error(
                status_code,
                &error_body,
                retry_after,
            ),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    async fn post(
        &self,
        url: Url,
        headers: HeaderMap,
        request: &GenerateContentRequest,
    ) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        tracing::debug!(url = url.as_str(), turns = request.contents.len(), "sending request");

        let result = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = result.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            self.map_send_error(e)
        })?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::debug!(error = %err, "request rejected");
            return Err(err);
        }
        Ok(response)
    }

    /// Send a request to the API and get a non-streaming response.
    pub async fn send(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent")?;
        let response = self.post(url, self.default_headers()?, request).await?;

        let response = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
            })?;
        response.check_blocked()?;
        Ok(response)
    }

    /// Send a request to the API and get a streaming response.
    ///
    /// Returns a stream of response chunks that can be processed incrementally.
    pub async fn stream(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ResponseStream> {
        let mut url = self.endpoint(model, "streamGenerateContent")?;
        url.set_query(Some("alt=sse"));

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self.post(url, headers, request).await?;
        Ok(Box::pin(process_sse(Box::pin(response.bytes_stream()))))
    }
}
