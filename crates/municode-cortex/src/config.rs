//! Cortex connection configuration

use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

use municode_core::{Error, Result};

pub const DEFAULT_DATABASE: &str = "SANDIEGO_AI";
pub const DEFAULT_SCHEMA: &str = "MUNI_CODE";
pub const DEFAULT_SERVICE: &str = "MUNI_CODE_SEARCH";

/// How the bearer token was issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    #[default]
    ProgrammaticAccessToken,
    KeypairJwt,
    Oauth,
}

impl TokenType {
    /// Value for the `X-Snowflake-Authorization-Token-Type` header
    pub fn header_value(&self) -> &'static str {
        match self {
            TokenType::ProgrammaticAccessToken => "PROGRAMMATIC_ACCESS_TOKEN",
            TokenType::KeypairJwt => "KEYPAIR_JWT",
            TokenType::Oauth => "OAUTH",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PROGRAMMATIC_ACCESS_TOKEN" | "PAT" => Ok(TokenType::ProgrammaticAccessToken),
            "KEYPAIR_JWT" | "JWT" => Ok(TokenType::KeypairJwt),
            "OAUTH" => Ok(TokenType::Oauth),
            other => Err(Error::Configuration(format!(
                "unsupported SNOWFLAKE_TOKEN_TYPE '{}'",
                other
            ))),
        }
    }
}

/// Configuration for the Cortex REST clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CortexConfig {
    pub account_url: String,
    pub token: String,
    pub token_type: TokenType,
    pub warehouse: Option<String>,
    pub database: String,
    pub schema: String,
    pub service: String,
}

impl CortexConfig {
    /// Create configuration from environment variables
    ///
    /// A `.env` file is only honoured once the caller has loaded it.
    pub fn from_env() -> Result<Self> {
        let account_url = env::var("SNOWFLAKE_ACCOUNT_URL").map_err(|_| {
            Error::Configuration("SNOWFLAKE_ACCOUNT_URL environment variable not found".to_string())
        })?;

        let token = env::var("SNOWFLAKE_TOKEN")
            .or_else(|_| env::var("SNOWFLAKE_PAT"))
            .map_err(|_| {
                Error::Configuration(
                    "SNOWFLAKE_TOKEN or SNOWFLAKE_PAT environment variable not found".to_string(),
                )
            })?;

        let mut config = Self::new(account_url, token)?;

        if let Ok(raw) = env::var("SNOWFLAKE_TOKEN_TYPE") {
            config.token_type = TokenType::parse(&raw)?;
        }
        config.warehouse = env::var("SNOWFLAKE_WAREHOUSE").ok().filter(|w| !w.trim().is_empty());

        if let Ok(database) = env::var("MUNICODE_DATABASE") {
            config.database = database;
        }
        if let Ok(schema) = env::var("MUNICODE_SCHEMA") {
            config.schema = schema;
        }
        if let Ok(service) = env::var("MUNICODE_SERVICE") {
            config.service = service;
        }

        Ok(config)
    }

    /// Create configuration with explicit values and the default service
    pub fn new(account_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let account_url = account_url.into();
        let parsed = Url::parse(&account_url).map_err(|e| {
            Error::Configuration(format!("invalid account URL '{}': {}", account_url, e))
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "account URL must be an http(s) base URL, got '{}'",
                account_url
            )));
        }

        Ok(Self {
            account_url: account_url.trim_end_matches('/').to_string(),
            token: token.into(),
            token_type: TokenType::default(),
            warehouse: None,
            database: DEFAULT_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            service: DEFAULT_SERVICE.to_string(),
        })
    }

    /// Point the configuration at another search service
    pub fn with_service(
        mut self,
        database: impl Into<String>,
        schema: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        self.database = database.into();
        self.schema = schema.into();
        self.service = service.into();
        self
    }

    /// `DATABASE.SCHEMA.SERVICE`
    pub fn qualified_service_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.service)
    }

    pub fn search_url(&self) -> Result<Url> {
        let query_segment = format!("{}:query", self.service);
        self.endpoint(&[
            "api",
            "v2",
            "databases",
            &self.database,
            "schemas",
            &self.schema,
            "cortex-search-services",
            &query_segment,
        ])
    }

    pub fn complete_url(&self) -> Result<Url> {
        self.endpoint(&["api", "v2", "cortex", "inference:complete"])
    }

    pub fn statements_url(&self) -> Result<Url> {
        self.endpoint(&["api", "v2", "statements"])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.account_url)
            .map_err(|e| Error::Configuration(format!("invalid account URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("account URL cannot be a base".to_string()))?
            .clear()
            .extend(segments);
        Ok(url)
    }
}
