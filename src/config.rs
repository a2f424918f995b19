use std::collections::BTreeMap;

use crate::{CodeSet, CoordinatorConfig, EnvelopeFormat, RequestError, Result};

/// Route authorization mode of the surrounding application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthRouteMode {
    #[default]
    Static,
    Dynamic,
}

/// Base URLs after proxy resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceBaseUrls {
    pub base_url: String,
    /// Base URL per additional backend flavor.
    pub other: BTreeMap<String, String>,
}

/// Environment-style service configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Envelope code marking backend success.
    pub success_code: String,
    pub logout_codes: CodeSet,
    pub modal_logout_codes: CodeSet,
    pub expired_token_codes: CodeSet,
    pub auth_route_mode: AuthRouteMode,
    pub base_url: String,
    pub other_base_urls: BTreeMap<String, String>,
    /// Route requests through the development proxy paths.
    pub http_proxy: bool,
    /// Prefix applied to credential-store keys.
    pub storage_prefix: String,
}

impl ServiceConfig {
    /// Reads configuration from process environment variables.
    ///
    /// Reads:
    /// - `SERVICE_BASE_URL` (required)
    /// - `SERVICE_SUCCESS_CODE` (default `0000`)
    /// - `SERVICE_LOGOUT_CODES`, `SERVICE_MODAL_LOGOUT_CODES`,
    ///   `SERVICE_EXPIRED_TOKEN_CODES` (comma-separated)
    /// - `AUTH_ROUTE_MODE` (`static` or `dynamic`)
    /// - `OTHER_SERVICE_BASE_URL` (JSON object of flavor key to base URL)
    /// - `HTTP_PROXY` (`Y` enables proxy paths)
    /// - `STORAGE_PREFIX`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, one call per variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SERVICE_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RequestError::Config("missing SERVICE_BASE_URL".to_owned()))?;

        let codes = |key: &str| CodeSet::parse(&lookup(key).unwrap_or_default());

        let auth_route_mode = match lookup("AUTH_ROUTE_MODE").as_deref().map(str::trim) {
            None | Some("") | Some("static") => AuthRouteMode::Static,
            Some("dynamic") => AuthRouteMode::Dynamic,
            Some(other) => {
                return Err(RequestError::Config(format!(
                    "AUTH_ROUTE_MODE must be 'static' or 'dynamic', got '{other}'"
                )))
            }
        };

        Ok(Self {
            success_code: lookup("SERVICE_SUCCESS_CODE")
                .map(|code| code.trim().to_owned())
                .filter(|code| !code.is_empty())
                .unwrap_or_else(|| "0000".to_owned()),
            logout_codes: codes("SERVICE_LOGOUT_CODES"),
            modal_logout_codes: codes("SERVICE_MODAL_LOGOUT_CODES"),
            expired_token_codes: codes("SERVICE_EXPIRED_TOKEN_CODES"),
            auth_route_mode,
            base_url: base_url.trim().to_owned(),
            other_base_urls: parse_other_base_urls(lookup("OTHER_SERVICE_BASE_URL").as_deref()),
            http_proxy: lookup("HTTP_PROXY").is_some_and(|value| value.trim() == "Y"),
            storage_prefix: lookup("STORAGE_PREFIX").unwrap_or_default(),
        })
    }

    /// Resolves base URLs, substituting proxy paths in proxy mode.
    pub fn base_urls(&self) -> ServiceBaseUrls {
        if !self.http_proxy {
            return ServiceBaseUrls {
                base_url: self.base_url.clone(),
                other: self.other_base_urls.clone(),
            };
        }
        ServiceBaseUrls {
            base_url: proxy_pattern(None),
            other: self
                .other_base_urls
                .keys()
                .map(|key| (key.clone(), proxy_pattern(Some(key.as_str()))))
                .collect(),
        }
    }

    /// Coordinator settings for the primary `{code, msg, data}` backend.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            envelope: EnvelopeFormat::code_msg_data(self.success_code.clone()),
            logout_codes: self.logout_codes.clone(),
            modal_logout_codes: self.modal_logout_codes.clone(),
            expired_token_codes: self.expired_token_codes.clone(),
            ..CoordinatorConfig::default()
        }
    }
}

fn proxy_pattern(key: Option<&str>) -> String {
    match key {
        None => "/proxy-default".to_owned(),
        Some(key) => format!("/proxy-{key}"),
    }
}

fn parse_other_base_urls(raw: Option<&str>) -> BTreeMap<String, String> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return BTreeMap::new();
    };
    match serde_json::from_str(raw) {
        Ok(urls) => urls,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_err, "OTHER_SERVICE_BASE_URL is not a valid JSON string");

            BTreeMap::new()
        }
    }
}
