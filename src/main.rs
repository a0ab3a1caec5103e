use anyhow::Result;
use clap::Parser;
use club_logos::{browser::ChromeLauncher, config::Cli, runner::Runner, store::RemoteStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = cli.store_config()?.map(RemoteStore::new).transpose()?;

    let keys = cli.resolve_keys().await?;
    let runner = Runner::new(
        ChromeLauncher::new(cli.browser_config()?),
        cli.scrape_options()?,
        cli.output_writer(),
        store,
    );
    runner.run(keys).await?;
    Ok(())
}
