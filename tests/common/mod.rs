use std::time::Duration;

use blog_api::{get_random_free_port, run_app, Config};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

pub struct TestApp {
    pub base_url: String,
    pub database_url: String,
    pub client: Client,
    _db_dir: TempDir,
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

pub async fn spawn_app() -> TestApp {
    let db_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let (port, address) = get_random_free_port().expect("No free port");
    let database_url = format!("sqlite://{}", db_dir.path().join("api.db").display());
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "integration-secret".to_owned(),
        bind_address: address,
        cleanup_interval: Duration::from_secs(3600),
    };
    tokio::spawn(async move {
        if let Err(e) = run_app(config).await {
            panic!("Server failed: {e:#}");
        }
    });

    let app = TestApp {
        base_url: format!("http://127.0.0.1:{port}"),
        database_url,
        client: Client::new(),
        _db_dir: db_dir,
    };
    for _ in 0..100 {
        if let Ok(response) = app.client.get(app.url("/up")).send().await {
            if response.status() == StatusCode::OK {
                return app;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("Server did not start");
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        self.url(&format!("/api/v1{path}"))
    }

    pub async fn signup(&self, name: &str, email: &str) -> TestUser {
        let response = self
            .client
            .post(self.api("/auth/signup"))
            .json(&json!({
                "user": {
                    "name": name,
                    "email": email,
                    "password": "password123",
                    "image": "https://example.com/image.jpg"
                }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        TestUser {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    pub async fn create_post(&self, user: &TestUser, tag_list: &str) -> Value {
        let response = self
            .client
            .post(self.api("/posts"))
            .bearer_auth(&user.token)
            .json(&json!({
                "post": { "title": "Test Post", "body": "This is a test post body", "tag_list": tag_list }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["post"].clone()
    }

    pub async fn get(&self, user: &TestUser, path: &str) -> Response {
        self.client
            .get(self.api(path))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, user: &TestUser, path: &str, body: Value) -> Response {
        self.client
            .put(self.api(path))
            .bearer_auth(&user.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, user: &TestUser, path: &str, body: Value) -> Response {
        self.client
            .post(self.api(path))
            .bearer_auth(&user.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, user: &TestUser, path: &str) -> Response {
        self.client
            .delete(self.api(path))
            .bearer_auth(&user.token)
            .send()
            .await
            .unwrap()
    }
}

pub fn tag_names(post: &Value) -> Vec<String> {
    post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap().to_owned())
        .collect()
}
