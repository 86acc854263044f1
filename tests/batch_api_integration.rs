use std::sync::Arc;

use media_catalog::config::AppConfig;
use media_catalog::{MemoryStore, Picture, RecordStore};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

/// Start the service on an ephemeral port over the given store.
async fn spawn_server(store: Arc<MemoryStore>, config: AppConfig) -> TestClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        media_catalog::serve(listener, store, &config).await.unwrap();
    });

    TestClient::new(format!("http://{}", address))
}

/// A store holding pictures 1..=4
async fn picture_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for name in ["Sunset", "Elephants", "Mountains", "Lighthouse"] {
        RecordStore::<Picture>::insert(&*store, Picture::new(name))
            .await
            .unwrap();
    }
    store
}

fn field_values(body: &Value, field: &str) -> Vec<Value> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item[field].clone())
        .collect()
}

#[tokio::test]
async fn test_batch_get_partial_validity() {
    let client = spawn_server(picture_store().await, AppConfig::default()).await;

    let response = client.get("/pictures?ids=2,3,4,0,-7").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(field_values(&body, "pictureId"), vec![json!(2), json!(3), json!(4)]);

    let response = client.get("/pictures?ids=9,10").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.get("/pictures?ids=").await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Whitespace around entries is tolerated
    let response = client.get("/pictures?ids=%201,%202").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_single_lookup_follows_batch_rules() {
    let client = spawn_server(picture_store().await, AppConfig::default()).await;

    assert_eq!(
        client.get("/pictures/0").await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        client.get("/pictures/-7").await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get("/pictures/abc").await.unwrap().status(),
        StatusCode::BAD_REQUEST
    );

    let response = client.get("/pictures/3").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Mountains");
}

#[tokio::test]
async fn test_bulk_tag_creation_workflow() {
    let client = spawn_server(picture_store().await, AppConfig::default()).await;
    let request = json!({
        "pictureId": 1,
        "tags": ["Casper, Wyoming", "Laramie, Wyoming"]
    });

    let response = client.post("/picture-tags/bulk", request.clone()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(field_values(&created, "pictureId"), vec![json!(1), json!(1)]);
    assert_eq!(
        field_values(&created, "name"),
        vec![json!("Casper, Wyoming"), json!("Laramie, Wyoming")]
    );

    // Not idempotent: the same request writes a second pair of rows
    let response = client.post("/picture-tags/bulk", request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.get("/picture-tags").await.unwrap();
    let all: Value = response.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 4);

    let response = client
        .post("/picture-tags/bulk", json!({"pictureId": 1, "tags": []}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "At least one target is required");
}

#[tokio::test]
async fn test_album_membership_under_collapse_policy() {
    let mut config = AppConfig::default();
    config.associations.dedup = media_catalog::DedupPolicy::Collapse;
    let client = spawn_server(picture_store().await, config).await;

    let response = client
        .post("/picture-albums", json!({"name": "Wyoming"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let album: Value = response.json().await.unwrap();
    let album_id = album["pictureAlbumId"].clone();

    let response = client
        .post(
            "/picture-album-pictures/bulk",
            json!({"pictureAlbumId": album_id, "pictureIds": [3, 1, 3, 4]}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let links: Value = response.json().await.unwrap();
    assert_eq!(
        field_values(&links, "pictureId"),
        vec![json!(3), json!(1), json!(4)]
    );
}

#[tokio::test]
async fn test_crud_round_trip_for_trainers() {
    let client = spawn_server(Arc::new(MemoryStore::new()), AppConfig::default()).await;

    assert_eq!(
        client.get("/trainers").await.unwrap().status(),
        StatusCode::NO_CONTENT
    );

    let response = client
        .post("/trainers", json!({"name": "Ash", "numberOfBadges": 7}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let trainer: Value = response.json().await.unwrap();
    assert_eq!(trainer["id"], 1);

    let response = client
        .put("/trainers", json!({"id": 1, "name": "Ash", "numberOfBadges": 8}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put("/trainers", json!({"id": 2, "name": "Gary", "numberOfBadges": 8}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        client.delete("/trainers?ids=1,2").await.unwrap().status(),
        StatusCode::OK
    );
    assert_eq!(
        client.get("/trainers/1").await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_storage_faults_surface_as_opaque_errors() {
    let store = picture_store().await;
    let client = spawn_server(store.clone(), AppConfig::default()).await;

    store.fail_writes_after(1);
    let response = client
        .post(
            "/picture-tags/bulk",
            json!({"pictureId": 2, "tags": ["Savannah", "Chobe", "Botswana"]}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Internal server error"}));

    store.clear_faults();
    assert_eq!(
        client.get("/picture-tags").await.unwrap().status(),
        StatusCode::NO_CONTENT
    );

    store.fail_reads(true);
    assert_eq!(
        client.get("/pictures?ids=1").await.unwrap().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_bulk_owner_must_be_a_stored_record() {
    let client = spawn_server(picture_store().await, AppConfig::default()).await;

    let response = client
        .post("/picture-tags/bulk", json!({"pictureId": -5, "tags": ["x"]}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"], "Owning identifier must be positive");

    let response = client
        .post(
            "/picture-album-pictures/bulk",
            json!({"pictureAlbumId": -3, "pictureIds": [1]}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post("/picture-tags/bulk", json!({"pictureId": 12, "tags": ["x"]}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        client.get("/picture-tags").await.unwrap().status(),
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn test_owner_scoped_listings() {
    let client = spawn_server(picture_store().await, AppConfig::default()).await;

    assert_eq!(
        client.get("/pictures/2/tags").await.unwrap().status(),
        StatusCode::NO_CONTENT
    );
    client
        .post("/picture-tags/bulk", json!({"pictureId": 2, "tags": ["Chobe", "Botswana"]}))
        .await
        .unwrap();
    let response = client.get("/pictures/2/tags").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tags: Value = response.json().await.unwrap();
    assert_eq!(field_values(&tags, "name"), vec![json!("Chobe"), json!("Botswana")]);

    let response = client
        .post("/picture-albums", json!({"name": "Safari"}))
        .await
        .unwrap();
    let album: Value = response.json().await.unwrap();
    let album_id = album["pictureAlbumId"].as_i64().unwrap();
    client
        .post(
            "/picture-album-pictures/bulk",
            json!({"pictureAlbumId": album_id, "pictureIds": [2, 4]}),
        )
        .await
        .unwrap();

    let response = client
        .get(&format!("/picture-albums/{}/pictures", album_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let pictures: Value = response.json().await.unwrap();
    assert_eq!(
        field_values(&pictures, "name"),
        vec![json!("Elephants"), json!("Lighthouse")]
    );

    // Deleting a picture drops its tags and album links with it
    assert_eq!(
        client.delete("/pictures/2").await.unwrap().status(),
        StatusCode::OK
    );
    assert_eq!(
        client.get("/pictures/2/tags").await.unwrap().status(),
        StatusCode::NO_CONTENT
    );
    let response = client
        .get(&format!("/picture-albums/{}/pictures", album_id))
        .await
        .unwrap();
    let pictures: Value = response.json().await.unwrap();
    assert_eq!(field_values(&pictures, "pictureId"), vec![json!(4)]);
}

#[tokio::test]
async fn test_blob_lookup_and_low_resolution() {
    let store = picture_store().await;
    let blob_id = Uuid::new_v4();
    RecordStore::<Picture>::insert(&*store, Picture::new("Prairie").with_blob_id(blob_id))
        .await
        .unwrap();
    let client = spawn_server(store, AppConfig::default()).await;

    let response = client
        .get(&format!("/pictures/blob/{}", blob_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let picture: Value = response.json().await.unwrap();
    assert_eq!(picture["pictureId"], 5);
    assert_eq!(picture["hasLowResolution"], false);

    assert_eq!(
        client
            .get("/pictures/blob/00000000-0000-0000-0000-000000000000")
            .await
            .unwrap()
            .status(),
        StatusCode::BAD_REQUEST
    );

    let response = client
        .put(
            "/pictures/low-resolution",
            json!({"pictureId": 5, "hasLowResolution": true}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"pictureId": 5, "hasLowResolution": true}));

    let response = client.get("/pictures/5").await.unwrap();
    let picture: Value = response.json().await.unwrap();
    assert_eq!(picture["hasLowResolution"], true);
    assert_eq!(picture["blobId"], blob_id.to_string());

    let response = client
        .put(
            "/pictures/low-resolution",
            json!({"pictureId": 50, "hasLowResolution": true}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let client = spawn_server(Arc::new(MemoryStore::new()), AppConfig::default()).await;
    let response = client.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
