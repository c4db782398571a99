//! Environment configuration.

use std::net::SocketAddr;

use anyhow::Context;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_COMPANY_CODE: &str = "01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// HS256 shared secret for bearer tokens.
    pub jwt_secret: String,
    /// Company code used in document numbers when the tenant has none.
    pub default_company_code: String,
}

impl ApiConfig {
    /// Defaults for everything but the secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            default_company_code: DEFAULT_COMPANY_CODE.to_string(),
        }
    }

    /// Read `BIND_ADDR`, `JWT_SECRET` and `DEFAULT_COMPANY_CODE`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDR is not a socket address: {raw_addr}"))?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let default_company_code = lookup("DEFAULT_COMPANY_CODE")
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| DEFAULT_COMPANY_CODE.to_string());
        orderflow_core::validate_company_code(&default_company_code)
            .with_context(|| format!("invalid DEFAULT_COMPANY_CODE: {default_company_code}"))?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            default_company_code,
        })
    }
}
