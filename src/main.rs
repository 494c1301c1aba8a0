use std::process::ExitCode;

use ton_pool_starter::cli::CliArgs;
use ton_pool_starter::config::{find_project_root, LauncherConfig};
use ton_pool_starter::console::Console;
use ton_pool_starter::signal;
use ton_pool_starter::supervisor::{launch, Supervisor, SystemHost};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr and stay quiet unless RUST_LOG asks for more;
    // stdout belongs to the status lines.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::from_env();

    let root = find_project_root(&std::env::current_dir()?);
    tracing::info!("project root: {}", root.display());
    let config = LauncherConfig::for_project(root);

    let interrupt = signal::install_interrupt_listener();
    let host = SystemHost::new(launch::for_host());
    let outcome = Supervisor::new(host, config, Console::stdout(), interrupt)
        .with_tunnel(args.tunnel)
        .run()
        .await;

    tracing::info!("launcher finished: {:?}", outcome);
    Ok(ExitCode::from(outcome.exit_code()))
}
