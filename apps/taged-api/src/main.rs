use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = taged_api::Args::parse();

	taged_api::run(args).await
}
