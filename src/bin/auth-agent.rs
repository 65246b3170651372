use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use auth_agent::client::authenticating::AuthenticatingClient;
use auth_agent::config::proc_loader;
use auth_agent::server;
use auth_agent::transport::reqwest_executor::ReqwestExecutor;
use auth_agent::utils::logging;
use auth_agent::utils::logging::LogLevel;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "auth-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, start logging
    // -------------------------------

    let args = Args::parse();
    let service_config = proc_loader::file_to_config(Path::new(&args.config))?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Create request executor, shared by token fetches and proxied requests
    // -------------------------------

    let executor = Arc::new(ReqwestExecutor::from_config(
        &service_config.settings.transport,
    )?);

    // -------------------------------
    // 3. Authenticating client
    // -------------------------------

    let client = AuthenticatingClient::from_config(executor, &service_config.provider)?;

    // -------------------------------
    // 4. Start proxy server
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, client).await
}
