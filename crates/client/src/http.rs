//! HTTP adapters for the storefront API.
//!
//! [`AuthApi`] and [`ProductRemote`] are the seams the auth context and the
//! product synchronizer depend on; tests substitute in-memory fakes.

use std::future::Future;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use bazaar_core::api::{
    AuthResponse, ErrorResponse, LoginRequest, RegisterRequest, RestoreSessionRequest,
    SuccessResponse, TokenRequest, TokenResponse,
};
use bazaar_core::{Product, SessionToken};

use crate::auth::AUTH_TOKEN_KEY;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::storage::LocalStorage;

/// Storefront auth endpoints.
pub trait AuthApi: Send + Sync + 'static {
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    fn logout(&self, token: &SessionToken)
    -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Rotate `token`; the old value is dead once this returns `Ok`.
    fn refresh(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<SessionToken, ClientError>> + Send;

    fn validate(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    fn restore(
        &self,
        request: &RestoreSessionRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;
}

/// The server copy of the product list.
pub trait ProductRemote: Send + Sync + 'static {
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, ClientError>> + Send;

    /// Replace the server list wholesale.
    fn replace_products(
        &self,
        products: &[Product],
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// Thin JSON client over the storefront base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// `POST` a JSON body and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` for non-2xx responses.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)?).json(body);
        send(request).await
    }

    /// `GET` and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` for non-2xx responses.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        send(self.client.get(self.url(path)?)).await
    }

    /// `PUT` a JSON body with an optional bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` for non-2xx responses.
    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&SessionToken>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.put(self.url(path)?).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token.as_str());
        }
        send(request).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map_or_else(|_| status.to_string(), |body| body.error);
        debug!(status = status.as_u16(), %message, "Storefront rejected request");
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json().await?)
}

/// [`AuthApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    api: ApiClient,
}

impl HttpAuthApi {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            api: ApiClient::new(config),
        }
    }
}

impl AuthApi for HttpAuthApi {
    #[instrument(skip_all, fields(email = %request.email))]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.api.post("/auth/login", request).await
    }

    #[instrument(skip_all, fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.api.post("/auth/register", request).await
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), ClientError> {
        let _: SuccessResponse = self
            .api
            .post("/auth/logout", &TokenRequest {
                token: token.clone(),
            })
            .await?;
        Ok(())
    }

    async fn refresh(&self, token: &SessionToken) -> Result<SessionToken, ClientError> {
        let response: TokenResponse = self
            .api
            .post("/auth/refresh", &TokenRequest {
                token: token.clone(),
            })
            .await?;
        Ok(response.token)
    }

    async fn validate(&self, token: &SessionToken) -> Result<AuthResponse, ClientError> {
        self.api
            .post("/auth/validate", &TokenRequest {
                token: token.clone(),
            })
            .await
    }

    async fn restore(&self, request: &RestoreSessionRequest) -> Result<AuthResponse, ClientError> {
        self.api.post("/auth/restore-session", request).await
    }
}

/// [`ProductRemote`] over HTTP.
///
/// Writes authenticate with whatever token the tab currently holds, so a
/// rotation by the auth context is picked up on the next push.
#[derive(Debug, Clone)]
pub struct HttpProductRemote {
    api: ApiClient,
    storage: LocalStorage,
}

impl HttpProductRemote {
    #[must_use]
    pub fn new(config: &ClientConfig, storage: LocalStorage) -> Self {
        Self {
            api: ApiClient::new(config),
            storage,
        }
    }
}

impl ProductRemote for HttpProductRemote {
    async fn fetch_products(&self) -> Result<Vec<Product>, ClientError> {
        let entries: Vec<serde_json::Value> = self.api.get("/api/products").await?;
        Ok(Product::filter_valid(entries))
    }

    async fn replace_products(&self, products: &[Product]) -> Result<(), ClientError> {
        let token = self
            .storage
            .get_item(AUTH_TOKEN_KEY)
            .map(SessionToken::new);
        let _: Vec<Product> = self
            .api
            .put("/api/products", products, token.as_ref())
            .await?;
        Ok(())
    }
}
