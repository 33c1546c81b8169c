use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = studio_operator::cli::Cli::parse();
    if let Err(e) = studio_operator::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
