use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use netbox_mcp_runtime::{McpCommands, NetBoxArgs, run};

#[derive(Parser)]
#[command(
    name = "netbox-mcp",
    version,
    about = "NetBox MCP server over stdio"
)]
struct Cli {
    #[command(flatten)]
    netbox: NetBoxArgs,

    #[command(subcommand)]
    command: Option<McpCommands>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "netbox_mcp=info,netbox_mcp_runtime=info,netbox_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let code = run(cli.netbox, cli.command).await;
    std::process::exit(code);
}
