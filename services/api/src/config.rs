//! API service configuration
//!
//! Each component keeps its own `from_env`; this aggregates the service's
//! own knobs. In production every required value must be present or startup
//! bails. In development the payment and email clients degrade to disabled.

use anyhow::Result;
use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::stripe::StripeConfig;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            other => Err(format!("unknown APP_ENV: {}", other)),
        }
    }
}

/// API service configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub app_env: AppEnv,
    /// Public base URL of the deployment
    pub base_url: String,
    pub port: u16,
    /// Shared JWT signing secret, same as the auth service's
    pub auth_secret: String,
    /// Absent means payments are disabled (development only)
    pub stripe: Option<StripeConfig>,
    /// Absent means invoice email is disabled (development only)
    pub resend_api_key: Option<String>,
}

impl ApiConfig {
    /// Read the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `APP_ENV`: development | production | test (default: development)
    /// - `APP_BASE_URL`: public base URL (default: http://localhost:3000)
    /// - `API_PORT`: listen port (default: 3001)
    /// - `AUTH_SECRET`: shared JWT secret (required)
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`: payment gateway keys
    /// - `RESEND_API_KEY`: email API key
    pub fn from_env() -> Result<Self> {
        let app_env: AppEnv = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;

        let base_url = env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let port = env::var("API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3001);

        let auth_secret = env::var("AUTH_SECRET")
            .map_err(|_| anyhow::anyhow!("AUTH_SECRET environment variable not set"))?;

        let stripe = match (
            env::var("STRIPE_SECRET_KEY").ok(),
            env::var("STRIPE_WEBHOOK_SECRET").ok(),
        ) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeConfig {
                secret_key,
                webhook_secret,
            }),
            _ => None,
        };

        let resend_api_key = env::var("RESEND_API_KEY").ok();

        if app_env == AppEnv::Production {
            if stripe.is_none() {
                anyhow::bail!(
                    "STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET are required in production"
                );
            }
            if resend_api_key.is_none() {
                anyhow::bail!("RESEND_API_KEY is required in production");
            }
        } else {
            if stripe.is_none() {
                warn!("Stripe keys not set, payments disabled");
            }
            if resend_api_key.is_none() {
                warn!("RESEND_API_KEY not set, invoice email disabled");
            }
        }

        Ok(Self {
            app_env,
            base_url,
            port,
            auth_secret,
            stripe,
            resend_api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            for var in [
                "APP_ENV",
                "APP_BASE_URL",
                "API_PORT",
                "AUTH_SECRET",
                "STRIPE_SECRET_KEY",
                "STRIPE_WEBHOOK_SECRET",
                "RESEND_API_KEY",
            ] {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn development_degrades_without_gateway_keys() {
        clear_env();
        unsafe {
            env::set_var("AUTH_SECRET", "test-secret");
        }

        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.port, 3001);
        assert!(config.stripe.is_none());
        assert!(config.resend_api_key.is_none());
    }

    #[test]
    #[serial]
    fn production_requires_gateway_keys() {
        clear_env();
        unsafe {
            env::set_var("AUTH_SECRET", "test-secret");
            env::set_var("APP_ENV", "production");
        }

        assert!(ApiConfig::from_env().is_err());

        unsafe {
            env::set_var("STRIPE_SECRET_KEY", "sk_test_x");
            env::set_var("STRIPE_WEBHOOK_SECRET", "whsec_x");
        }
        assert!(ApiConfig::from_env().is_err());

        unsafe {
            env::set_var("RESEND_API_KEY", "re_x");
        }
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.app_env, AppEnv::Production);
        assert!(config.stripe.is_some());

        clear_env();
    }

    #[test]
    #[serial]
    fn auth_secret_is_always_required() {
        clear_env();
        assert!(ApiConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn unknown_app_env_is_rejected() {
        clear_env();
        unsafe {
            env::set_var("AUTH_SECRET", "test-secret");
            env::set_var("APP_ENV", "staging");
        }

        assert!(ApiConfig::from_env().is_err());
        clear_env();
    }
}
