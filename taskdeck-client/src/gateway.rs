//! API gateway: the single outbound HTTP boundary
//!
//! Every request to the remote API goes through [`Gateway`]. It:
//! - joins the path onto the configured base URL
//! - attaches `Authorization: Bearer <token>` when the session holds a token
//! - decodes the JSON body of 2xx responses
//! - turns non-2xx responses into [`ClientError`]s carrying the status and the
//!   server's `message`, unchanged
//!
//! It never retries and never caches.
//!
//! # Session eviction
//!
//! A 401 from any endpoint evicts the session through the
//! [`SessionHandle`](crate::session::SessionHandle) before the error is
//! returned. Eviction is synchronous and does not depend on which operation
//! made the request; it also publishes
//! [`SessionEvent::LoginRequired`](crate::session::SessionEvent::LoginRequired)
//! so the presentation layer can send the user back to the login screen.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskdeck_client::config::ClientConfig;
//! use taskdeck_client::gateway::Gateway;
//! use taskdeck_client::session::SessionHandle;
//! use taskdeck_shared::models::MessageResponse;
//! use taskdeck_shared::storage::{MemoryStore, SessionStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::for_base_url("http://localhost:3000/api");
//! let session = SessionHandle::new(SessionStore::new(Arc::new(MemoryStore::new())));
//! let gateway = Gateway::new(&config, session)?;
//!
//! let health: MessageResponse = gateway.get("/health").await?;
//! println!("API healthy: {}", health.success);
//! # Ok(())
//! # }
//! ```

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use taskdeck_shared::models::{ApiResponse, ErrorBody, MessageResponse};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionHandle;

/// Outbound HTTP client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    http: reqwest::Client,
    config: ClientConfig,
    session: SessionHandle,
}

impl Gateway {
    /// Creates a gateway for `config`, reading credentials from `session`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionHandle) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .user_agent(concat!("taskdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                http,
                config: config.clone(),
                session,
            }),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.inner.config.api.base_url
    }

    /// `GET path`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(Method::GET, path);
        self.send(Method::GET, path, request).await
    }

    /// `GET path?query`
    ///
    /// `None` fields of `query` are left out of the query string.
    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> ClientResult<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::GET, path).query(query);
        self.send(Method::GET, path, request).await
    }

    /// `POST path` with a JSON body
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, request).await
    }

    /// `PUT path` with a JSON body
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body);
        self.send(Method::PUT, path, request).await
    }

    /// `DELETE path`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, request).await
    }

    /// Checks that the API is reachable (`GET /health`)
    pub async fn health(&self) -> ClientResult<MessageResponse> {
        let response: MessageResponse = self.get("/health").await?;
        if !response.success {
            return Err(ClientError::Rejected {
                message: response.message,
            });
        }
        Ok(response)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.inner.config.endpoint(path);
        let request = self.inner.http.request(method, url);

        match self.inner.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        tracing::debug!(%method, path, "Sending request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Request failed without a response");
            ClientError::Transport(e.to_string())
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let message = error_message(response).await;
            tracing::warn!(%method, path, "Authentication rejected, evicting session");
            self.inner.session.evict();
            return Err(ClientError::Unauthorized { message });
        }

        if !status.is_success() {
            let message = error_message(response).await;
            tracing::debug!(%method, path, status = status.as_u16(), ?message, "Request returned an error status");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Response body did not match the expected shape");
            ClientError::Decode(e.to_string())
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}

/// Extracts `message` from an error body, if the body has one
async fn error_message(response: Response) -> Option<String> {
    let body = response.bytes().await.ok()?;
    serde_json::from_slice::<ErrorBody>(&body).ok()?.message
}

/// Unwraps the `data` of a `{success, data}` envelope
///
/// # Errors
///
/// - [`ClientError::Rejected`] if `success` is false
/// - [`ClientError::Decode`] if `data` is missing
pub fn expect_data<T>(response: ApiResponse<T>) -> ClientResult<T> {
    if !response.success {
        return Err(ClientError::Rejected {
            message: response.message,
        });
    }
    response
        .data
        .ok_or_else(|| ClientError::Decode("response is missing 'data'".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_data_success() {
        let value = expect_data(ApiResponse::ok(7)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_expect_data_rejected() {
        let response: ApiResponse<u32> = ApiResponse {
            success: false,
            data: None,
            message: Some("Nope".to_string()),
        };

        let err = expect_data(response).unwrap_err();
        assert_eq!(err.server_message(), Some("Nope"));
        assert!(matches!(err, ClientError::Rejected { .. }));
    }

    #[test]
    fn test_expect_data_missing_payload() {
        let response: ApiResponse<u32> = ApiResponse {
            success: true,
            data: None,
            message: None,
        };

        assert!(matches!(expect_data(response), Err(ClientError::Decode(_))));
    }
}
