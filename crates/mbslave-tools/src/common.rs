use clap::Args;
use mbslave_server::{Master, MasterConfig, MasterError};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 502)]
    pub port: u16,
    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout: u64,
}

pub async fn connect_master(args: &ConnectionArgs) -> Result<Master, MasterError> {
    let addr = format!("{}:{}", args.host, args.port);
    let config =
        MasterConfig::default().with_response_timeout(Duration::from_millis(args.timeout));
    Master::connect_with_config(addr, config).await
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
