//! HTTP client for the Mesto API.
//!
//! Every operation goes through [`Api::request`]. A 2xx response is decoded
//! as JSON. Any other status becomes [`ClientError::Status`] and the body is
//! not read. The underlying client keeps a cookie store, so the session
//! cookie set by [`Api::authorize`] rides along on later calls.

use reqwest::{
    Client, Method, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use mesto_types::api::{
    CardResponse, CreateCardRequest, MessageResponse, SigninRequest, SignupRequest,
    UpdateAvatarRequest, UpdateProfileRequest, UserResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Error: {0}")]
    Status(StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

pub struct ApiOptions {
    pub base_url: String,
    /// Sent with every request.
    pub headers: HeaderMap,
}

impl ApiOptions {
    /// Options with the JSON content type header.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            base_url: base_url.into(),
            headers,
        }
    }
}

const NO_BODY: Option<&()> = None;

pub struct Api {
    base_url: Url,
    client: Client,
}

impl Api {
    pub fn new(options: ApiOptions) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(&options.base_url)?;
        // Relative paths join under the base path only with a trailing slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(options.headers)
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Issue `method` on `path` (relative to the base URL) with an optional
    /// JSON body.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.base_url.join(path)?;
        let mut req = self.client.request(method.clone(), url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!("{} {} -> {}", method, path, status);
            return Err(ClientError::Status(status));
        }

        Ok(resp.json::<T>().await?)
    }

    // -- Users --

    pub async fn get_user_info(&self) -> Result<UserResponse, ClientError> {
        self.request(Method::GET, "users/me", NO_BODY).await
    }

    pub async fn edit_profile(&self, name: &str, about: &str) -> Result<UserResponse, ClientError> {
        let body = UpdateProfileRequest {
            name: name.to_string(),
            about: about.to_string(),
        };
        self.request(Method::PATCH, "users/me", Some(&body)).await
    }

    pub async fn update_avatar(&self, avatar: &str) -> Result<UserResponse, ClientError> {
        let body = UpdateAvatarRequest {
            avatar: avatar.to_string(),
        };
        self.request(Method::PATCH, "users/me/avatar", Some(&body)).await
    }

    // -- Cards --

    pub async fn get_initial_cards(&self) -> Result<Vec<CardResponse>, ClientError> {
        self.request(Method::GET, "cards", NO_BODY).await
    }

    /// Cards and the current user, fetched concurrently. Fails if either does.
    pub async fn get_app_info(&self) -> Result<(Vec<CardResponse>, UserResponse), ClientError> {
        tokio::try_join!(self.get_initial_cards(), self.get_user_info())
    }

    pub async fn add_card(&self, name: &str, link: &str) -> Result<CardResponse, ClientError> {
        let body = CreateCardRequest {
            name: name.to_string(),
            link: link.to_string(),
        };
        self.request(Method::POST, "cards", Some(&body)).await
    }

    pub async fn delete_card(&self, card_id: Uuid) -> Result<MessageResponse, ClientError> {
        self.request(Method::DELETE, &format!("cards/{card_id}"), NO_BODY)
            .await
    }

    /// Flip the caller's like: unlike when `is_liked`, like otherwise.
    pub async fn change_like_card_status(
        &self,
        card_id: Uuid,
        is_liked: bool,
    ) -> Result<CardResponse, ClientError> {
        if is_liked {
            self.remove_like(card_id).await
        } else {
            self.set_like(card_id).await
        }
    }

    pub async fn set_like(&self, card_id: Uuid) -> Result<CardResponse, ClientError> {
        self.request(Method::PUT, &format!("cards/{card_id}/likes"), NO_BODY)
            .await
    }

    pub async fn remove_like(&self, card_id: Uuid) -> Result<CardResponse, ClientError> {
        self.request(Method::DELETE, &format!("cards/{card_id}/likes"), NO_BODY)
            .await
    }

    // -- Session --

    pub async fn register(&self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let body = SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: None,
            about: None,
            avatar: None,
        };
        self.request(Method::POST, "signup", Some(&body)).await
    }

    pub async fn authorize(&self, email: &str, password: &str) -> Result<MessageResponse, ClientError> {
        let body = SigninRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.request(Method::POST, "signin", Some(&body)).await
    }

    pub async fn sign_out(&self) -> Result<MessageResponse, ClientError> {
        self.request(Method::DELETE, "signout", NO_BODY).await
    }
}
