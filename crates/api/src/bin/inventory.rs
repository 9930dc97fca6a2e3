use videopalace_infra::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env("inventory", "0.0.0.0:8081")?;
    videopalace_observability::init(&config.service_name);

    videopalace_api::server::run_inventory(config).await
}
