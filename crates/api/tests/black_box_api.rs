use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use videopalace_api::app::services::{
    Broker, CatalogServices, CatalogStore, Dispatcher, InventoryServices, InventoryStore, dispatcher,
    spawn_inventory_worker,
};
use videopalace_api::app::{build_catalog_app, build_inventory_app};
use videopalace_events::{InMemoryEventBus, RetryPolicy};
use videopalace_infra::workers::WorkerHandle;
use videopalace_infra::{InMemoryEntityStore, InventoryClient, SeedOutcome, ServiceConfig};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: axum::Router) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn test_config(strategy: &str, inventory_base_url: &str) -> ServiceConfig {
    let strategy = strategy.to_string();
    let inventory_base_url = inventory_base_url.to_string();
    let mut config = ServiceConfig::from_lookup("test", "127.0.0.1:0", |key| match key {
        "SYNC_STRATEGY" => Some(strategy.clone()),
        "INVENTORY_BASE_URL" => Some(inventory_base_url.clone()),
        _ => None,
    })
    .unwrap();
    config.retry = RetryPolicy::fixed(3, Duration::from_millis(1));
    config
}

fn in_memory_broker() -> Broker {
    Broker::InMemory(Arc::new(
        InMemoryEventBus::new().with_block_timeout(Duration::from_millis(10)),
    ))
}

fn catalog_services(dispatcher: Dispatcher) -> Arc<CatalogServices> {
    let store: CatalogStore = Arc::new(InMemoryEntityStore::new());
    Arc::new(CatalogServices::new(store, dispatcher))
}

async fn inventory_server() -> TestServer {
    let store: InventoryStore = Arc::new(InMemoryEntityStore::new());
    TestServer::spawn(build_inventory_app(Arc::new(InventoryServices::new(store)))).await
}

/// Catalog + inventory wired through an in-process broker, consumer worker running.
async fn event_stack() -> (TestServer, TestServer, WorkerHandle) {
    let config = test_config("events", "http://unused");
    let broker = in_memory_broker();

    let inventory_store: InventoryStore = Arc::new(InMemoryEntityStore::new());
    let worker = spawn_inventory_worker(&config, &broker, inventory_store.clone())
        .await
        .unwrap()
        .expect("event strategy runs a worker");
    let inventory = TestServer::spawn(build_inventory_app(Arc::new(InventoryServices::new(inventory_store)))).await;

    let catalog = TestServer::spawn(build_catalog_app(catalog_services(dispatcher(&config, &broker)))).await;
    (catalog, inventory, worker)
}

fn ghostbusters() -> Value {
    json!({
        "title": "Ghostbusters",
        "description": "Three parapsychologists start a ghost-catching business.",
        "category": "Comedy",
        "rating": "PG",
        "releaseYear": 1984
    })
}

async fn inventory_eventually(client: &reqwest::Client, base_url: &str, expected: usize) -> Vec<Value> {
    // The event strategy is eventually consistent; poll briefly.
    for _ in 0..100 {
        let records: Vec<Value> = client
            .get(format!("{}/inventory", base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if records.len() >= expected {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("inventory did not reach {expected} records within timeout");
}

#[tokio::test]
async fn health_endpoints_respond() {
    let (catalog, inventory, worker) = event_stack().await;
    let client = reqwest::Client::new();

    for base in [&catalog.base_url, &inventory.base_url] {
        let res = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    worker.shutdown().await;
}

#[tokio::test]
async fn event_strategy_creates_inventory_asynchronously() {
    let (catalog, inventory, worker) = event_stack().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/catalog", catalog.base_url))
        .json(&ghostbusters())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(location, format!("/catalog/{}", id));
    assert_eq!(created["releaseYear"], 1984);

    let fetched: Value = client
        .get(format!("{}{}", catalog.base_url, location))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["title"], "Ghostbusters");

    let records = inventory_eventually(&client, &inventory.base_url, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["sourceId"], id.as_str());
    assert_eq!(records[0]["title"], "Ghostbusters");
    assert_eq!(records[0]["totalQuantity"], 1);
    assert_eq!(records[0]["availableQuantity"], 1);

    worker.shutdown().await;
}

#[tokio::test]
async fn direct_strategy_creates_inventory_before_responding() {
    let inventory = inventory_server().await;
    let catalog = TestServer::spawn(build_catalog_app(catalog_services(Arc::new(InventoryClient::new(
        inventory.base_url.clone(),
    )))))
    .await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/catalog", catalog.base_url))
        .json(&ghostbusters())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();

    let records: Vec<Value> = client
        .get(format!("{}/inventory", inventory.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["sourceId"], created["id"]);
    assert_eq!(records[0]["totalQuantity"], 1);
}

#[tokio::test]
async fn direct_strategy_failure_is_a_bad_gateway_but_the_item_is_kept() {
    // Nothing listens on this port once the listener is dropped.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let catalog = TestServer::spawn(build_catalog_app(catalog_services(Arc::new(InventoryClient::new(dead_url))))).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/catalog", catalog.base_url))
        .json(&ghostbusters())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "synchronization_failed");

    let item_id = body["itemId"].as_str().unwrap();
    let res = client
        .get(format!("{}/catalog/{}", catalog.base_url, item_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn seeding_with_direct_strategy_populates_inventory() {
    let inventory = inventory_server().await;
    let config = test_config("direct", &inventory.base_url);
    let services = catalog_services(dispatcher(&config, &in_memory_broker()));
    let catalog = TestServer::spawn(build_catalog_app(services.clone())).await;
    let client = reqwest::Client::new();

    assert_eq!(services.seeder.seed_if_empty().await.unwrap(), SeedOutcome::Seeded { count: 3 });
    assert_eq!(services.seeder.seed_if_empty().await.unwrap(), SeedOutcome::Skipped);

    let items: Vec<Value> = client
        .get(format!("{}/catalog", catalog.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(items.len(), 3);

    let records = inventory_eventually(&client, &inventory.base_url, 3).await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r["availableQuantity"] == r["totalQuantity"]));
}

#[tokio::test]
async fn catalog_rejects_bad_input_and_unknown_ids() {
    let (catalog, _inventory, worker) = event_stack().await;
    let client = reqwest::Client::new();

    let mut blank = ghostbusters();
    blank["title"] = json!("  ");
    let res = client
        .post(format!("{}/catalog", catalog.base_url))
        .json(&blank)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = client
        .get(format!("{}/catalog/not-a-uuid", catalog.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("{}/catalog/{}", catalog.base_url, uuid::Uuid::now_v7()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    worker.shutdown().await;
}

#[tokio::test]
async fn inventory_direct_create_validates_and_sets_available_to_total() {
    let inventory = inventory_server().await;
    let client = reqwest::Client::new();
    let source_id = uuid::Uuid::now_v7().to_string();

    let res = client
        .post(format!("{}/inventory", inventory.base_url))
        .json(&json!({"sourceId": source_id, "title": "Alien", "totalQuantity": -1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(format!("{}/inventory", inventory.base_url))
        .json(&json!({"sourceId": source_id, "title": "Alien", "totalQuantity": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["totalQuantity"], 4);
    assert_eq!(created["availableQuantity"], 4);

    let res = client
        .get(format!("{}{}", inventory.base_url, location))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/inventory/{}", inventory.base_url, uuid::Uuid::now_v7()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn direct_strategy_runs_no_consumer_worker() {
    let config = test_config("direct", "http://unused");
    let store: InventoryStore = Arc::new(InMemoryEntityStore::new());

    let worker = spawn_inventory_worker(&config, &in_memory_broker(), store).await.unwrap();
    assert!(worker.is_none());
}
