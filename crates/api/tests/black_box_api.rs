use gateway_infra::config::GatewayConfig;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let config = GatewayConfig::from_lookup(|_| None).expect("default config");
        let app = gateway_api::app::build_app(&config).await.expect("build app");
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_account(client: &reqwest::Client, srv: &TestServer, api_key: &str, balance: f64) -> serde_json::Value {
    let res = client
        .post(srv.url("/accounts"))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "api_key": api_key,
            "balance": balance,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_key_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/accounts")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/invoices"))
        .header("X-API-Key", "nobody")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn account_lifecycle_create_credit_debit_query() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_account(&client, &srv, "K1", 100.0).await;
    assert_eq!(created["name"], "Alice");
    assert_eq!(created["balance"].as_f64().unwrap(), 100.0);
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/accounts/balance"))
        .header("X-API-Key", "K1")
        .json(&json!({ "amount": 50 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["balance"].as_f64().unwrap(), 150.0);

    let res = client
        .post(srv.url("/accounts/balance"))
        .header("X-API-Key", "K1")
        .json(&json!({ "amount": -30 }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["balance"].as_f64().unwrap(), 120.0);

    let res = client
        .get(srv.url(&format!("/accounts/{}", id)))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"].as_str().unwrap(), id);
    assert_eq!(body["balance"].as_f64().unwrap(), 120.0);
}

#[tokio::test]
async fn duplicate_api_key_is_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_account(&client, &srv, "K1", 0.0).await;

    let res = client
        .post(srv.url("/accounts"))
        .json(&json!({ "name": "Mallory", "email": "m@example.com", "api_key": "K1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_account");
}

#[tokio::test]
async fn generated_api_key_authenticates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/accounts"))
        .json(&json!({ "name": "Bob", "email": "bob@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let key = created["api_key"].as_str().unwrap().to_string();
    assert_eq!(key.len(), 32);

    let res = client
        .get(srv.url("/accounts"))
        .header("X-API-Key", &key)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], created["id"]);
}

#[tokio::test]
async fn other_accounts_are_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = create_account(&client, &srv, "KA", 10.0).await;
    create_account(&client, &srv, "KB", 10.0).await;

    let res = client
        .get(srv.url(&format!("/accounts/{}", alice["id"].as_str().unwrap())))
        .header("X-API-Key", "KB")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/accounts/not-a-uuid"))
        .header("X-API-Key", "KB")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invoice_lifecycle_create_settle_and_double_settle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_account(&client, &srv, "K1", 100.0).await;

    let res = client
        .post(srv.url("/invoices"))
        .header("X-API-Key", "K1")
        .json(&json!({ "amount": 40, "description": "hosting" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let invoice: serde_json::Value = res.json().await.unwrap();
    assert_eq!(invoice["status"], "pending");
    let id = invoice["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/invoices"))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);

    let res = client
        .post(srv.url(&format!("/invoices/{}/settle", id)))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let settled: serde_json::Value = res.json().await.unwrap();
    assert_eq!(settled["status"], "approved");

    let res = client
        .post(srv.url(&format!("/invoices/{}/settle", id)))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .get(srv.url("/accounts"))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    let account: serde_json::Value = res.json().await.unwrap();
    assert_eq!(account["balance"].as_f64().unwrap(), 60.0);
}

#[tokio::test]
async fn invoice_validation_and_ownership() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    create_account(&client, &srv, "KA", 0.0).await;
    create_account(&client, &srv, "KB", 0.0).await;

    let res = client
        .post(srv.url("/invoices"))
        .header("X-API-Key", "KA")
        .json(&json!({ "amount": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/invoices"))
        .header("X-API-Key", "KA")
        .json(&json!({ "amount": 12.5 }))
        .send()
        .await
        .unwrap();
    let invoice: serde_json::Value = res.json().await.unwrap();
    let id = invoice["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/invoices/{}/reject", id)))
        .header("X-API-Key", "KB")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url(&format!("/invoices/{}/reject", id)))
        .header("X-API-Key", "KA")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rejected: serde_json::Value = res.json().await.unwrap();
    assert_eq!(rejected["status"], "rejected");

    let res = client
        .get(srv.url("/invoices/0190a0a0-0000-7000-8000-000000000000"))
        .header("X-API-Key", "KA")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unstorable_amounts_are_bad_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for balance in [json!(0.00001), json!(100_000_000_000_000_000u64)] {
        let res = client
            .post(srv.url("/accounts"))
            .json(&json!({ "name": "Alice", "email": "a@example.com", "api_key": "K1", "balance": balance }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    create_account(&client, &srv, "K1", 9_000_000_000_000_000.0).await;
    for amount in [json!(0.00001), json!(2_000_000_000_000_000u64)] {
        let res = client
            .post(srv.url("/accounts/balance"))
            .header("X-API-Key", "K1")
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    let res = client
        .get(srv.url("/accounts"))
        .header("X-API-Key", "K1")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["balance"].as_f64().unwrap(), 9_000_000_000_000_000.0);
}
