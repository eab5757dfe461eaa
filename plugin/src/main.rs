#[tokio::main]
async fn main() -> anyhow::Result<()> {
    googleworkspace_lib::run().await?;
    Ok(())
}
