//! Integration tests for the cyclefuse HTTP server

use cyclefuse::model::SourceWeights;
use cyclefuse::server::{run, ServerConfig};
use std::time::Duration;

async fn start_server(secrets: Vec<String>) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let config = ServerConfig::new(0, secrets, SourceWeights::new());
    let (addr, shutdown_tx) = run(config).await.expect("Failed to start server");

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, shutdown_tx)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_predict_endpoint() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let request = serde_json::json!({
        "currentCycleStart": "2025-02-01",
        "historicalCycles": [],
        "observations": [],
        "externalPredictions": [
            {
                "source": "flo",
                "fertileStart": "2025-02-10",
                "fertileEnd": "2025-02-15",
                "confidence": 70
            }
        ]
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/predict", addr))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let prediction = &body["prediction"];
    assert!(prediction["fertileStart"].as_str().is_some());
    assert!(prediction["confidence"].as_f64().unwrap() > 0.0);
    // Calendar + external = two inputs.
    assert_eq!(prediction["diagnostics"]["inputPredictions"], 2);
    assert!(body["quality"]["score"].as_i64().is_some());

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_import_endpoint() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let csv = "Date,Temp,CM,OPK\n\
               2024-01-15,97.2,egg white,negative\n\
               2024-01-16,97.3,watery,positive\n";

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/import", addr))
        .header("Content-Type", "text/csv")
        .body(csv)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["success"], true);
    // Two rows, three kinds each present on both: 3 + 3 observations.
    assert_eq!(body["observations"].as_array().unwrap().len(), 6);
    assert_eq!(body["validation"]["valid"], true);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_import_without_date_column_is_client_error() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/import", addr))
        .body("Temp,CM\n97.2,dry\n")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["code"], "MISSING_DATE_COLUMN");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_insights_endpoint() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let request = serde_json::json!({
        "cycles": [
            {
                "id": "c1",
                "startDate": "2024-01-01",
                "length": 28,
                "periodLength": 5,
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            },
            {
                "id": "c2",
                "startDate": "2024-01-29",
                "length": 29,
                "periodLength": 5,
                "createdAt": "2024-01-29T00:00:00Z",
                "updatedAt": "2024-01-29T00:00:00Z"
            }
        ],
        "observations": []
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/insights", addr))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["cycleCount"], 2);
    assert_eq!(body["regularity"], "regular");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_shared_secret_gate() {
    let (addr, shutdown_tx) = start_server(vec!["test-secret".to_string()]).await;

    let request = serde_json::json!({ "currentCycleStart": "2025-02-01" });
    let client = reqwest::Client::new();

    // No key: rejected.
    let response = client
        .post(format!("http://{}/predict", addr))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Correct key: admitted.
    let response = client
        .post(format!("http://{}/predict", addr))
        .header("x-api-key", "test-secret")
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_cors_preflight() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;

    let client = reqwest::Client::new();
    let response = client
        .request(reqwest::Method::OPTIONS, format!("http://{}/predict", addr))
        .header("Origin", "http://localhost")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to send request");

    // CORS preflight should succeed
    assert!(
        response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
        "CORS preflight failed: {}",
        response.status()
    );

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_import_then_predict_uses_stored_data() {
    let (addr, shutdown_tx) = start_server(Vec::new()).await;
    let client = reqwest::Client::new();

    // A dense observation run with an LH surge on 2025-02-12.
    let mut csv = String::from("Date,OPK\n");
    for day in 1..=20 {
        let result = if day == 12 { "positive" } else { "negative" };
        csv.push_str(&format!("2025-02-{:02},{}\n", day, result));
    }
    let response = client
        .post(format!("http://{}/import", addr))
        .body(csv)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Predict without inline observations: the stored ones apply.
    let response = client
        .post(format!("http://{}/predict", addr))
        .json(&serde_json::json!({ "currentCycleStart": "2025-02-01" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    // Calendar plus the symptom prediction recovered from the store.
    assert_eq!(body["prediction"]["diagnostics"]["inputPredictions"], 2);

    let _ = shutdown_tx.send(());
}
