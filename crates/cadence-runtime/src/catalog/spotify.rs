//! Spotify Web API catalog, authenticated with the client-credentials flow.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{CatalogError, CatalogSearch, CatalogTrack};
use crate::secrets::{ApiCredential, CredentialSource};

pub const SPOTIFY_CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
pub const SPOTIFY_CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Refresh this long before the token actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: ApiCredential,
    expires_at: Instant,
}

pub struct SpotifyCatalog {
    client_id: ApiCredential,
    client_secret: ApiCredential,
    market: Option<String>,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for SpotifyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyCatalog")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("market", &self.market)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct TrackItem {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistItem>,
}

#[derive(Deserialize)]
struct ArtistItem {
    name: String,
}

impl From<TrackItem> for CatalogTrack {
    fn from(item: TrackItem) -> Self {
        CatalogTrack {
            id: item.id,
            name: item.name,
            artists: item.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

impl SpotifyCatalog {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::with_credentials(
            ApiCredential::new(client_id, CredentialSource::Programmatic, "Spotify client id"),
            ApiCredential::new(
                client_secret,
                CredentialSource::Programmatic,
                "Spotify client secret",
            ),
        )
    }

    fn with_credentials(client_id: ApiCredential, client_secret: ApiCredential) -> Self {
        Self {
            client_id,
            client_secret,
            market: None,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Read `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`.
    pub fn from_env() -> Result<Self, CatalogError> {
        let id = ApiCredential::from_env(SPOTIFY_CLIENT_ID_ENV, "Spotify client id")?;
        let secret = ApiCredential::from_env(SPOTIFY_CLIENT_SECRET_ENV, "Spotify client secret")?;
        Ok(Self::with_credentials(id, secret))
    }

    pub fn with_market(mut self, market: Option<String>) -> Self {
        self.market = market;
        self
    }

    /// A valid bearer token, fetching a new one when missing or stale.
    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.expose().to_string());
            }
        }

        tracing::debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(self.client_id.expose(), Some(self.client_secret.expose()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Auth(format!("{} - {}", status.as_u16(), body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = body.access_token;
        *cached = Some(AccessToken {
            value: ApiCredential::new(value.clone(), CredentialSource::Programmatic, "Spotify token"),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }
}

#[async_trait]
impl CatalogSearch for SpotifyCatalog {
    async fn search_track(&self, query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
        let token = self.access_token().await?;

        let mut params = vec![("q", query), ("type", "track"), ("limit", "1")];
        if let Some(market) = self.market.as_deref() {
            params.push(("market", market));
        }

        let response = self
            .client
            .get(format!("{}/search", API_BASE))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            self.token.lock().await.take();
            return Err(CatalogError::Auth("access token rejected".to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Http(e.to_string()))?;
        Ok(body.tracks.items.into_iter().next().map(CatalogTrack::from))
    }

    fn name(&self) -> &str {
        "spotify"
    }
}
