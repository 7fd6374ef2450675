use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use clap::Parser;
use heartbeat_service::modimpl::app::App;
use heartbeat_service::modimpl::config::EnvLoader;
use heartbeat_service::modimpl::healthstatus::HealthTracker;
use heartbeat_service::modimpl::logger::init_logging;

#[derive(Parser, Debug)]
#[command(name = "heartbeat-service")]
#[command(about = "Periodic processing service with environment validation and health tracking")]
pub struct Args {
    /// dotenv file read before the environment; a missing file is ignored
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    /// Validate the configuration and exit without starting
    #[arg(long)]
    pub check: bool,
}

fn load_env_file(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to read env file {}", path.display())),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    load_env_file(&args.env_file)?;
    let loader = EnvLoader::from_process();
    let config = loader.load()
        .context("Failed to load configuration from the environment")?;

    let _log_guard = init_logging(config.environment, &args.log_dir);
    let config = loader.validate()
        .context("Environment validation failed")?;

    if args.check {
        println!("{}", config.summary());
        return Ok(());
    }

    let app = App::new(&config, HealthTracker::new());
    app.run().await
}
