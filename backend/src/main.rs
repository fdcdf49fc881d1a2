#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rastreando::start_server().await
}
