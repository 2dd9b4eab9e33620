use clap::{ArgAction, Args};
use netbox_core::{ClientConfig, ClientError, NetBoxRestClient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set (flag or environment variable)")]
    Missing(&'static str),

    #[error("invalid NetBox client configuration: {0}")]
    Client(#[from] ClientError),
}

/// Connection settings shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct NetBoxArgs {
    /// NetBox base URL, e.g. https://netbox.example.com
    #[arg(long, global = true, env = "NETBOX_URL")]
    pub netbox_url: Option<String>,

    /// NetBox API token
    #[arg(long, global = true, env = "NETBOX_TOKEN", hide_env_values = true)]
    pub netbox_token: Option<String>,

    /// Verify the server's TLS certificate
    #[arg(
        long,
        global = true,
        env = "NETBOX_VERIFY_SSL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub verify_ssl: bool,

    /// Branch schema id to scope object requests to at startup
    #[arg(long, global = true, env = "NETBOX_BRANCH")]
    pub branch: Option<String>,
}

impl NetBoxArgs {
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        Ok(ClientConfig {
            base_url: required(self.netbox_url.as_deref(), "NETBOX_URL")?,
            token: required(self.netbox_token.as_deref(), "NETBOX_TOKEN")?,
            verify_ssl: self.verify_ssl,
            branch: self
                .branch
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string),
        })
    }

    pub fn build_client(&self) -> Result<NetBoxRestClient, ConfigError> {
        Ok(NetBoxRestClient::new(self.client_config()?)?)
    }
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}
