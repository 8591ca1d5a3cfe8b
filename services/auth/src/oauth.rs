//! OAuth2 integration for Google sign-in

use anyhow::Result;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// OAuth2 configuration for the Google provider
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl OAuthConfig {
    /// Read the Google client credentials from the environment. Returns
    /// `None` when they are not configured so the service can start with
    /// Google sign-in disabled.
    ///
    /// # Environment Variables
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`
    /// - `APP_BASE_URL`: public base URL the callback is registered under
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Some(Self {
            client_id,
            client_secret,
            redirect_url: format!("{}/auth/oauth/google/callback", base_url),
        })
    }
}

/// OAuth2 client wrapper around the Google authorization code flow
#[derive(Clone)]
pub struct OAuthClient {
    client: BasicClient,
}

impl OAuthClient {
    /// Create a new OAuth2 client for Google
    pub fn new_google(config: OAuthConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url.clone())?);

        Ok(Self { client })
    }

    /// Generate an authorization URL with PKCE
    pub fn generate_auth_url(
        &self,
        scopes: &[&str],
    ) -> Result<(String, CsrfToken, PkceCodeVerifier)> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        for scope in scopes {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (auth_url, csrf_token) = request.url();

        Ok((auth_url.to_string(), csrf_token, pkce_verifier))
    }

    /// Exchange the authorization code for an access token
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<String> {
        info!("Exchanging Google authorization code for access token");

        let token_response = self
            .client
            .exchange_code(oauth2::AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(oauth2::reqwest::async_http_client)
            .await?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Fetch the signed-in user's Google profile
    pub async fn get_user_profile(&self, access_token: &str) -> Result<OAuthUserProfile> {
        let client = reqwest::Client::new();
        let response = client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Failed to get Google user profile: {}",
                response.status()
            ));
        }

        let google_user: GoogleUser = response.json().await?;
        Ok(OAuthUserProfile {
            id: google_user.id,
            email: google_user.email,
            name: google_user.name.unwrap_or_else(|| {
                format!(
                    "{} {}",
                    google_user.given_name.unwrap_or_default(),
                    google_user.family_name.unwrap_or_default()
                )
                .trim()
                .to_string()
            }),
            picture: google_user.picture,
            verified_email: google_user.verified_email,
        })
    }
}

/// Google userinfo response
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: String,
    verified_email: bool,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Profile information extracted from the provider
#[derive(Debug, Clone)]
pub struct OAuthUserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub verified_email: bool,
}

/// In-flight OAuth state stashed in Redis between redirect and callback
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthSession {
    pub csrf_token: String,
    pub pkce_verifier: String,
    pub created_at: u64,
}

impl OAuthSession {
    /// Redis key the session is stored under, derived from the CSRF state
    pub fn key(state: &str) -> String {
        format!("oauth:state:{}", state)
    }
}
