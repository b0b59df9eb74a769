use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = kennel_server::config::from_env();
    let server = kennel_server::build(&config).await?;
    server.listen().await
}
