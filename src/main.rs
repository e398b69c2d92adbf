#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = assessment_session::run().await {
        eprintln!("assessment-runner fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
