use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::application::render::RawMarkupPolicy;
use crate::domain::Theme;

/// Command-line arguments for the gitreader binary.
#[derive(Debug, Parser)]
#[command(
    name = "gitreader",
    version,
    about = "Search GitHub repositories and read their READMEs"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GITREADER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the explorer HTTP service.
    Serve(Box<ServeArgs>),
    /// Render a Markdown file to HTML on stdout.
    Render(RenderArgs),
    /// Search GitHub repositories and print one result per line.
    Search(SearchArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override how raw HTML in Markdown is treated (escape|sanitize|trust).
    #[arg(long = "render-raw-markup", value_name = "POLICY")]
    pub raw_markup: Option<RawMarkupPolicy>,

    /// Override the maximum block nesting depth before rendering degrades.
    #[arg(long = "render-max-depth", value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Override the number of rendered READMEs kept in memory (0 disables).
    #[arg(long = "render-cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GithubOverrides {
    /// Override the GitHub REST API base URL.
    #[arg(long = "github-api-base", value_name = "URL")]
    pub api_base: Option<String>,

    /// Override the GitHub access token.
    #[arg(long = "github-token", env = "GITHUB_TOKEN", value_name = "TOKEN")]
    pub token: Option<String>,

    /// Override the GitHub request timeout.
    #[arg(long = "github-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the number of search results per page.
    #[arg(long = "github-per-page", value_name = "COUNT")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    #[command(flatten)]
    pub github: GithubOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the public URL used to build checkout return links.
    #[arg(long = "server-public-url", value_name = "URL")]
    pub server_public_url: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the checkout function endpoint.
    #[arg(long = "checkout-endpoint", value_name = "URL")]
    pub checkout_endpoint: Option<String>,

    /// Override the identity user-info endpoint.
    #[arg(long = "identity-userinfo-url", value_name = "URL")]
    pub identity_userinfo_url: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Markdown file to render; `-` reads stdin.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Colour scheme for highlighted code.
    #[arg(long, default_value = "light", value_name = "THEME")]
    pub theme: Theme,

    /// Base URL that root-relative links and images resolve against.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Prepend the theme stylesheet in a `<style>` element.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub standalone: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub github: GithubOverrides,

    /// Search terms, passed to GitHub verbatim.
    #[arg(value_name = "QUERY", required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Results page to fetch.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}
