//! HTTP-level tests of the reqwest adapters against a mock Kodo service.

use std::io::Write;

use kodo_client::{HostOverrides, KodoConfig, ListQuery, StorageFacade};
use serde_json::{json, Map};
use tempfile::NamedTempFile;
use wiremock::matchers::{
    body_json, body_string, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn facade_for(server: &MockServer) -> StorageFacade {
    let config = KodoConfig::new("access", "secret").with_hosts(HostOverrides::all(server.uri()));
    StorageFacade::new(config).expect("valid config")
}

#[tokio::test]
async fn test_stat_sends_signed_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stat/cGhvdG9zOmEuanBn"))
        .and(header("Authorization", "QBox access:CKSaLpw4knMxiSiYy12LNZo2I0s="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fsize": 3,
            "hash": "FhHash",
            "mimeType": "image/jpeg",
            "putTime": 17000000000000000i64,
            "type": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo.stat("photos", "a.jpg").await;

    assert!(env.is_ok(), "{}", env.message());
    assert_eq!(env.data().unwrap().hash, "FhHash");
}

#[tokio::test]
async fn test_set_access_signs_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/private"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(header("Authorization", "QBox access:EY53-LsJNPKm3UYht2zNUQP4rRU="))
        .and(body_string("bucket=photos&private=1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    assert!(kodo.set_bucket_access("photos", "private").await.is_ok());
}

#[tokio::test]
async fn test_service_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drop/ghost"))
        .respond_with(ResponseTemplate::new(631).set_body_json(json!({"error": "no such bucket"})))
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo.drop_bucket("ghost").await;

    assert!(!env.is_ok());
    assert_eq!(env.code(), Some(631));
    assert_eq!(env.message(), "no such bucket");
}

#[tokio::test]
async fn test_batch_posts_op_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .and(body_string(
            "op=/delete/cGhvdG9zOmEuanBn&op=/delete/cGhvdG9zOmIuanBn",
        ))
        .respond_with(ResponseTemplate::new(298).set_body_json(json!([
            {"code": 200},
            {"code": 612, "data": {"error": "no such file or directory"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo.batch_delete("photos", ["a.jpg", "b.jpg"]).await;

    assert!(env.is_ok(), "{}", env.message());
    let items = env.data().unwrap();
    assert!(items[0].is_success());
    assert_eq!(items[1].error(), Some("no such file or directory"));
}

#[tokio::test]
async fn test_list_follows_markers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("bucket", "photos"))
        .and(query_param("marker", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "marker": "",
            "items": [{"key": "c", "fsize": 1, "hash": "h"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("bucket", "photos"))
        .and(header("Authorization", "QBox access:9BeDCptrTZB2PoJSJja8Cw4t0VA="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "marker": "page-2",
            "items": [
                {"key": "a", "fsize": 1, "hash": "h"},
                {"key": "b", "fsize": 1, "hash": "h"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo.list_all("photos", ListQuery::default()).await;

    let keys: Vec<String> = env
        .data()
        .unwrap()
        .items
        .iter()
        .map(|item| item.key.clone())
        .collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_cdn_refresh_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/tune/refresh"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"dirs": ["https://cdn.example.com/img/"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "error": "success",
            "requestId": "job-7",
            "dirQuotaDay": 10,
            "dirSurplusDay": 9
        })))
        .expect(1)
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo
        .refresh(&[], &["https://cdn.example.com/img/".to_string()])
        .await;

    let job = env.data().unwrap();
    assert_eq!(job.request_id.as_deref(), Some("job-7"));
    assert_eq!(job.dir_surplus_day, Some(9));
}

#[tokio::test]
async fn test_cdn_error_status_keeps_provider_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/tune/prefetch"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400031,
            "error": "invalid url",
            "invalidUrls": ["ftp://x"]
        })))
        .mount(&server)
        .await;

    let kodo = facade_for(&server).await;
    let env = kodo.prefetch_urls(&["ftp://x".to_string()]).await;

    assert_eq!(env.code(), Some(400031));
    assert_eq!(env.message(), "invalid url");
}

#[tokio::test]
async fn test_form_upload_sends_token_key_and_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("name=\"token\""))
        .and(body_string_contains("name=\"key\""))
        .and(body_string_contains("upload payload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "docs/readme.txt",
            "hash": "FhHash",
            "fsize": 14
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"upload payload").unwrap();

    let kodo = facade_for(&server).await;
    let env = kodo
        .upload("docs", file.path(), Some("docs/readme.txt"))
        .await;

    assert!(env.is_ok(), "{}", env.message());
    let stored = env.data().unwrap().stored().unwrap();
    assert_eq!(stored.key, "docs/readme.txt");
    assert_eq!(stored.fsize, Some(14));
}

#[tokio::test]
async fn test_upload_with_return_body_keeps_custom_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "a.txt",
            "size": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"abc").unwrap();

    let kodo = facade_for(&server).await;
    let mut policy = Map::new();
    policy.insert(
        "returnBody".to_string(),
        json!(r#"{"name":$(fname),"size":$(fsize)}"#),
    );
    let token = kodo
        .upload_token("docs", Some("a.txt"), 3600, Some(&policy), true)
        .into_data()
        .unwrap();

    let env = kodo.upload_with_token(&token, file.path(), Some("a.txt")).await;

    assert!(env.is_ok(), "{}", env.message());
    assert_eq!(env.code(), None);
    let result = env.data().unwrap();
    assert!(result.stored().is_none());
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({"name": "a.txt", "size": 3})
    );
}

#[tokio::test]
async fn test_unreachable_host_has_local_code() {
    let config = KodoConfig::new("access", "secret")
        .with_hosts(HostOverrides::all("http://127.0.0.1:9"));
    let kodo = StorageFacade::new(config).unwrap();

    let env = kodo.delete("photos", "a.jpg").await;
    assert_eq!(env.code(), Some(-1));
}

/// Live smoke test against a real account.
#[tokio::test]
#[ignore = "requires Kodo credentials"]
async fn test_live_bucket_listing() {
    dotenvy::dotenv().ok();

    let kodo = StorageFacade::from_env().expect("KODO_ACCESS_KEY and KODO_SECRET_KEY must be set");
    let env = kodo.buckets().await;

    assert!(env.is_ok(), "{}", env.message());
    println!("{}", serde_json::to_string_pretty(&env).unwrap());
}
