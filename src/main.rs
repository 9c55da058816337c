use clap::Parser;
use sig_review::{cli, config, console, error, gateway, session};
use cli::{Cli, Commands};
use config::Config;
use error::{ReviewError, Result};
use gateway::HttpGateway;
use session::{DocumentOutcome, ReviewSession};
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sig_review=debug" } else { "sig_review=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    let span = match config.operator.as_deref() {
        Some(name) => tracing::info_span!("operator", name),
        None => tracing::Span::none(),
    };
    run(cli, config).instrument(span).await
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let server_url = cli.server_url.clone().unwrap_or_else(|| config.server_url());

    let build_session = || -> Result<ReviewSession<HttpGateway>> {
        let gateway = HttpGateway::new(&server_url, config.timeout())
            .map_err(|e| ReviewError::Config(e.to_string()))?;
        tracing::debug!(server = %gateway.base_url(), "using matching service");
        Ok(ReviewSession::new(gateway, config.timeout()))
    };

    match cli.command {
        Commands::Review { filename } => {
            let session = build_session()?;
            console::run_review(&session, &filename).await?;
        }

        Commands::Extract { filename, output } => {
            let session = build_session()?;
            if session.open_document(&filename).await? == DocumentOutcome::NoSignatures {
                eprintln!("No signatures extracted.");
            }
            let records: Vec<_> = session.entries().into_iter().map(|e| e.record).collect();
            let json = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("✔ Saved {} signatures: {}", records.len(), path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Lookup { filename, line } => {
            let session = build_session()?;
            session.open_document(&filename).await?;
            let id = session.resolve(&line)?;
            let results = session.fetch_details(id).await?;
            println!("{}", console::render_details(&line, &results));
        }

        Commands::Config { set_server_url, set_timeout, set_operator, show } => {
            let mut config = config.clone();
            let changed = set_server_url.is_some() || set_timeout.is_some() || set_operator.is_some();

            if let Some(url) = set_server_url {
                config.set_server_url(url)?;
            }
            if let Some(seconds) = set_timeout {
                config.set_timeout(seconds)?;
            }
            if let Some(name) = set_operator {
                config.operator = Some(name).filter(|n| !n.trim().is_empty());
            }
            if changed {
                config.save()?;
                println!("✔ Settings saved: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("Settings:");
                println!("  Server URL: {}", config.server_url());
                println!("  Timeout: {}s", config.timeout().as_secs());
                println!("  Operator: {}", config.operator.as_deref().unwrap_or("(not set)"));
            }
        }
    }

    Ok(())
}
