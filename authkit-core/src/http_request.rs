//! HTTP plumbing for the account service client.
//!
//! A thin wrapper on a shared `reqwest::Client` applying sensible defaults:
//! timeouts, user-agent, HTTPS enforcement, and retry middleware for
//! transient failures on read-only calls. Handshake submissions are never
//! retried; their challenge is one-time and a replay would be rejected
//! server-side anyway.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{AuthKitError, AuthResult};

pub(crate) struct Request {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new() -> Self {
        let client = reqwest::Client::new();
        let timeout = Duration::from_secs(10);
        let max_retries = 2; // total attempts = 3
        Self {
            client,
            timeout,
            max_retries,
        }
    }

    /// Creates a request builder with defaults applied.
    fn req(&self, method: Method, url: &str) -> RequestBuilder {
        assert!(
            url.starts_with("https") || url.starts_with("http://127.0.0.1"),
            "account service URL must be HTTPS"
        );

        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header(
                "User-Agent",
                format!("authkit-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }

    /// Creates a GET request builder with defaults applied.
    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.req(Method::GET, url)
    }

    /// Creates a POST request builder with defaults applied.
    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Creates a DELETE request builder with defaults applied.
    pub(crate) fn delete(&self, url: &str) -> RequestBuilder {
        self.req(Method::DELETE, url)
    }

    /// Sends a request exactly once. Used for handshake submissions and
    /// revocations, whose side effects must not be replayed.
    pub(crate) async fn send(&self, request_builder: RequestBuilder) -> AuthResult<Response> {
        execute_request_builder(request_builder)
            .await
            .map_err(Into::into)
    }

    /// Sends a read-only request with retries for transient failures.
    pub(crate) async fn send_with_retry(
        &self,
        request_builder: RequestBuilder,
    ) -> AuthResult<Response> {
        let Some(template) = request_builder.try_clone() else {
            return self.send(request_builder).await;
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries as usize);

        (|| async {
            let request_builder = template.try_clone().ok_or_else(|| {
                RequestHandleError::permanent(
                    "<unknown>".to_string(),
                    None,
                    "request cannot be retried because it is not cloneable".to_string(),
                )
            })?;
            execute_request_builder(request_builder).await
        })
        .retry(backoff)
        .when(RequestHandleError::is_retryable)
        .await
        .map_err(Into::into)
    }
}

/// Decodes a JSON response body.
pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> AuthResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| AuthKitError::Serialization {
            detail: format!("invalid response body: {err}"),
        })
}

#[derive(Debug)]
struct RequestHandleError {
    url: String,
    status: Option<u16>,
    error: String,
    retryable: bool,
    cancelled: bool,
}

impl RequestHandleError {
    const fn retryable(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: true,
            cancelled: false,
        }
    }

    const fn permanent(url: String, status: Option<u16>, error: String) -> Self {
        Self {
            url,
            status,
            error,
            retryable: false,
            cancelled: false,
        }
    }

    const fn cancelled(url: String, error: String) -> Self {
        Self {
            url,
            status: None,
            error,
            retryable: false,
            cancelled: true,
        }
    }

    const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<RequestHandleError> for AuthKitError {
    fn from(value: RequestHandleError) -> Self {
        if value.cancelled {
            return Self::OperationCancelled;
        }
        Self::Network {
            url: value.url,
            status: value.status,
            detail: value.error,
        }
    }
}

async fn execute_request_builder(
    request_builder: RequestBuilder,
) -> Result<Response, RequestHandleError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| {
        RequestHandleError::permanent(
            err.url()
                .map(ToString::to_string)
                .unwrap_or_else(|| "<unknown>".to_string()),
            None,
            format!("request build failed: {err}"),
        )
    })?;
    let url = request.url().to_string();

    match client.execute(request).await {
        Ok(resp) => {
            let status = resp.status().as_u16();
            if status == 429 || (500..600).contains(&status) {
                return Err(RequestHandleError::retryable(
                    url,
                    Some(status),
                    format!("request error with bad status code {status}"),
                ));
            }
            if !resp.status().is_success() {
                return Err(RequestHandleError::permanent(
                    url,
                    Some(status),
                    format!("request rejected with status code {status}"),
                ));
            }
            Ok(resp)
        }
        Err(err) => {
            if err.is_timeout() {
                // A transport timeout surfaces as cancellation, not as a
                // network failure.
                return Err(RequestHandleError::cancelled(
                    url,
                    format!("request cancelled by transport: {err}"),
                ));
            }
            if err.is_connect() {
                return Err(RequestHandleError::retryable(
                    url,
                    None,
                    format!("request connect error: {err}"),
                ));
            }

            Err(RequestHandleError::permanent(
                url,
                None,
                format!("request failed: {err}"),
            ))
        }
    }
}
