use clap::Parser;
use memecoin_agent::{config::AgentConfig, AgentRequest, Dispatcher, OutcomeKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run one chat command through the agent and print the reply
#[derive(Debug, Parser)]
#[command(name = "agent", version)]
struct Cli {
    /// Token address to use when the command does not mention one
    #[arg(long)]
    token: Option<String>,

    /// Log orders instead of submitting them
    #[arg(long)]
    dry_run: bool,

    /// The command, e.g. "buy 0.1 sol worth of <address>"
    #[arg(required = true, trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AgentConfig::from_env()?;
    config.dry_run |= cli.dry_run;

    let dispatcher = Dispatcher::from_config(&config)?;

    let mut request = AgentRequest::new(cli.command.join(" "));
    request.token_address = cli.token;

    info!(dry_run = config.dry_run, "Dispatching command");

    let reply = dispatcher.dispatch(request).await.into_reply();
    println!("{}", reply.message);

    if reply.kind == OutcomeKind::Failed {
        std::process::exit(1);
    }

    Ok(())
}
