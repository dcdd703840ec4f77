//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::render::RawMarkupPolicy;
use crate::domain::products::{Product, ProductCatalog};

mod cli;

pub use cli::*;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "gitreader";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com/";
const DEFAULT_GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com/";
const DEFAULT_GITHUB_USER_AGENT: &str = concat!("gitreader/", env!("CARGO_PKG_VERSION"));
const DEFAULT_GITHUB_TIMEOUT_SECS: u64 = 10;
const DEFAULT_GITHUB_PER_PAGE: u32 = 10;
const MAX_GITHUB_PER_PAGE: u32 = 100;
pub(crate) const DEFAULT_RENDER_MAX_DEPTH: usize = 128;
pub(crate) const DEFAULT_RENDER_CACHE_CAPACITY: usize = 256;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub github: GithubSettings,
    pub render: RenderSettings,
    pub checkout: CheckoutSettings,
    pub identity: IdentitySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub public_url: Url,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub api_base: Url,
    pub raw_base: Url,
    pub token: Option<String>,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub per_page: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub raw_markup: RawMarkupPolicy,
    pub max_depth: NonZeroUsize,
    pub cache_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Checkout is disabled when no endpoint is configured.
    pub endpoint: Option<Url>,
    pub api_key: Option<String>,
    pub success_url: Url,
    pub cancel_url: Url,
    pub catalog: ProductCatalog,
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Authentication is disabled when no user-info endpoint is configured.
    pub userinfo_url: Option<Url>,
    pub api_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("GITREADER").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_render_overrides(&args.overrides),
        Some(Command::Search(args)) => raw.apply_github_overrides(&args.github),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    github: RawGithubSettings,
    render: RawRenderSettings,
    checkout: RawCheckoutSettings,
    identity: RawIdentitySettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(url) = overrides.server_public_url.as_ref() {
            self.server.public_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(endpoint) = overrides.checkout_endpoint.as_ref() {
            self.checkout.endpoint = Some(endpoint.clone());
        }
        if let Some(url) = overrides.identity_userinfo_url.as_ref() {
            self.identity.userinfo_url = Some(url.clone());
        }

        self.apply_render_overrides(&overrides.render);
        self.apply_github_overrides(&overrides.github);
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(policy) = overrides.raw_markup {
            self.render.raw_markup = Some(policy.as_str().to_string());
        }
        if let Some(depth) = overrides.max_depth {
            self.render.max_depth = Some(depth);
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.render.cache_capacity = Some(capacity);
        }
    }

    fn apply_github_overrides(&mut self, overrides: &GithubOverrides) {
        if let Some(base) = overrides.api_base.as_ref() {
            self.github.api_base = Some(base.clone());
        }
        if let Some(token) = overrides.token.as_ref() {
            self.github.token = Some(token.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.github.request_timeout_seconds = Some(seconds);
        }
        if let Some(per_page) = overrides.per_page {
            self.github.per_page = Some(per_page);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            github,
            render,
            checkout,
            identity,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let github = build_github_settings(github)?;
        let render = build_render_settings(render)?;
        let checkout = build_checkout_settings(checkout, &server.public_url)?;
        let identity = build_identity_settings(identity)?;

        Ok(Self {
            server,
            logging,
            github,
            render,
            checkout,
            identity,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let public_url = match non_blank(server.public_url) {
        Some(value) => parse_url(&value, "server.public_url")?,
        None => parse_url(&format!("http://{addr}/"), "server.public_url")?,
    };

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        public_url,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_github_settings(github: RawGithubSettings) -> Result<GithubSettings, LoadError> {
    let api_base = directory_url(
        github.api_base.as_deref().unwrap_or(DEFAULT_GITHUB_API_BASE),
        "github.api_base",
    )?;
    let raw_base = directory_url(
        github.raw_base.as_deref().unwrap_or(DEFAULT_GITHUB_RAW_BASE),
        "github.raw_base",
    )?;

    let user_agent = non_blank(github.user_agent)
        .unwrap_or_else(|| DEFAULT_GITHUB_USER_AGENT.to_string());

    let timeout_secs = github
        .request_timeout_seconds
        .unwrap_or(DEFAULT_GITHUB_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "github.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let per_page_value = github.per_page.unwrap_or(DEFAULT_GITHUB_PER_PAGE);
    if per_page_value > MAX_GITHUB_PER_PAGE {
        return Err(LoadError::invalid(
            "github.per_page",
            format!("must not exceed {MAX_GITHUB_PER_PAGE}"),
        ));
    }
    let per_page = NonZeroU32::new(per_page_value)
        .ok_or_else(|| LoadError::invalid("github.per_page", "must be greater than zero"))?;

    Ok(GithubSettings {
        api_base,
        raw_base,
        token: non_blank(github.token),
        user_agent,
        request_timeout: Duration::from_secs(timeout_secs),
        per_page,
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let raw_markup = match non_blank(render.raw_markup) {
        Some(value) => RawMarkupPolicy::from_str(&value)
            .map_err(|reason| LoadError::invalid("render.raw_markup", reason))?,
        None => RawMarkupPolicy::default(),
    };

    let max_depth = NonZeroUsize::new(render.max_depth.unwrap_or(DEFAULT_RENDER_MAX_DEPTH))
        .ok_or_else(|| LoadError::invalid("render.max_depth", "must be greater than zero"))?;

    Ok(RenderSettings {
        raw_markup,
        max_depth,
        cache_capacity: render
            .cache_capacity
            .unwrap_or(DEFAULT_RENDER_CACHE_CAPACITY),
    })
}

fn build_checkout_settings(
    checkout: RawCheckoutSettings,
    public_url: &Url,
) -> Result<CheckoutSettings, LoadError> {
    let endpoint = non_blank(checkout.endpoint)
        .map(|value| parse_url(&value, "checkout.endpoint"))
        .transpose()?;

    let success_url = match non_blank(checkout.success_url) {
        Some(value) => parse_url(&value, "checkout.success_url")?,
        None => join_url(public_url, "success", "checkout.success_url")?,
    };
    let cancel_url = match non_blank(checkout.cancel_url) {
        Some(value) => parse_url(&value, "checkout.cancel_url")?,
        None => join_url(public_url, "cancel", "checkout.cancel_url")?,
    };

    let catalog = match checkout.products {
        Some(products) if products.is_empty() => {
            return Err(LoadError::invalid(
                "checkout.products",
                "at least one product is required",
            ));
        }
        Some(products) => ProductCatalog::new(products),
        None => ProductCatalog::default(),
    };

    Ok(CheckoutSettings {
        endpoint,
        api_key: non_blank(checkout.api_key),
        success_url,
        cancel_url,
        catalog,
    })
}

fn build_identity_settings(identity: RawIdentitySettings) -> Result<IdentitySettings, LoadError> {
    let userinfo_url = non_blank(identity.userinfo_url)
        .map(|value| parse_url(&value, "identity.userinfo_url"))
        .transpose()?;

    Ok(IdentitySettings {
        userinfo_url,
        api_key: non_blank(identity.api_key),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGithubSettings {
    api_base: Option<String>,
    raw_base: Option<String>,
    token: Option<String>,
    user_agent: Option<String>,
    request_timeout_seconds: Option<u64>,
    per_page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    raw_markup: Option<String>,
    max_depth: Option<usize>,
    cache_capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCheckoutSettings {
    endpoint: Option<String>,
    api_key: Option<String>,
    success_url: Option<String>,
    cancel_url: Option<String>,
    products: Option<Vec<Product>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawIdentitySettings {
    userinfo_url: Option<String>,
    api_key: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(value).map_err(|err| LoadError::invalid(key, format!("invalid URL `{value}`: {err}")))
}

/// Parse a base URL so that relative joins append to its path.
fn directory_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let trimmed = value.trim().trim_end_matches('/');
    parse_url(&format!("{trimmed}/"), key)
}

fn join_url(base: &Url, path: &str, key: &'static str) -> Result<Url, LoadError> {
    let base = directory_url(base.as_str(), key)?;
    base.join(path)
        .map_err(|err| LoadError::invalid(key, format!("cannot join `{path}`: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
