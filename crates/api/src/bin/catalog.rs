use videopalace_infra::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env("catalog", "0.0.0.0:8080")?;
    videopalace_observability::init(&config.service_name);

    videopalace_api::server::run_catalog(config).await
}
