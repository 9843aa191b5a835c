use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = idmatch_api::Args::parse();

	idmatch_api::run(args).await
}
