use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = sift_rerank::Args::parse();
	sift_rerank::run(args).await
}
