use clap::Parser;
use console::style;
use dotenv::dotenv;
use dpilot::app::Application;
use dpilot::cli::Args;
use dpilot::config::Config;
use dpilot::core::error::PilotError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "dpilot=debug" } else { "dpilot=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(args: Args) -> Result<(), PilotError> {
    let config = Config::load()?;
    let mut app = Application::new(args, config);
    app.run().await
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("{} {}", style("Error:").bold().red(), e);
        std::process::exit(1);
    }
}
