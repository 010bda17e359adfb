pub mod worker;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
	version = dowser_cli::VERSION,
	rename_all = "kebab",
	styles = dowser_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = dowser_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = dowser_storage::db::Db::connect(&config.storage.sqlite).await?;

	db.ensure_schema().await?;

	let state = worker::WorkerState {
		db,
		embedding: config.providers.embedding,
		worker: config.worker,
		provider: dowser_service::Providers::default().embedding,
	};

	tracing::info!("Embedding backfill worker started.");

	worker::run_worker(state).await
}
