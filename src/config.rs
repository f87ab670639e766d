use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::reconcilers::namespace::SERVICE_ACCOUNT_NAMESPACE_PATH;
use crate::reconcilers::CacheBuster;
use crate::telemetry::LogFormat;

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about)]
pub struct Settings {
    /// Username webhook callers must present via HTTP basic auth
    #[arg(long, env = "BASIC_AUTH_USER", value_name = "USER")]
    pub basic_auth_user: String,

    /// Password webhook callers must present via HTTP basic auth
    #[arg(long, env = "BASIC_AUTH_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    pub basic_auth_password: String,

    /// Update a matched ExternalSecret a second time after the wait interval.
    ///
    /// The variable accepts true/false, yes/no, on/off and 1/0 in any case.
    #[arg(
        long,
        env = "ENABLE_CACHE_BUSTER",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub enable_cache_buster: bool,

    #[arg(
        long,
        env = "CACHE_BUSTER_WAIT_INTERVAL",
        value_name = "DURATION",
        default_value = "2s",
        value_parser = humantime::parse_duration
    )]
    pub cache_buster_wait_interval: Duration,

    /// File holding the namespace to operate in
    #[arg(long, env = "NAMESPACE_FILE", default_value = SERVICE_ACCOUNT_NAMESPACE_PATH)]
    pub namespace_file: PathBuf,

    /// Kubeconfig to fall back to outside a cluster, instead of KUBECONFIG or ~/.kube/config
    #[arg(long, env = "KUBECONFIG_PATH", value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, env = "LISTEN_ADDRESS", default_value = "0.0.0.0:8000")]
    pub listen_address: SocketAddr,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn cache_buster(&self) -> CacheBuster {
        CacheBuster {
            enabled: self.enable_cache_buster,
            wait_interval: self.cache_buster_wait_interval,
        }
    }
}
