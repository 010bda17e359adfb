use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = dowser_worker::Args::parse();
	dowser_worker::run(args).await
}
