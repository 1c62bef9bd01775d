#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = scolaris::run().await {
        eprintln!("scolaris fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
