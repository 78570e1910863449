#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = medmentor::run().await {
        eprintln!("medmentor fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
