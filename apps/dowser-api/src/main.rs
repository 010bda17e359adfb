use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = dowser_api::Args::parse();
	dowser_api::run(args).await
}
