//! mongobench CLI entry point.

#[tokio::main]
async fn main() {
    if let Err(e) = mongobench_cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
