//! Integration tests for the HTTP metadata transport.

use metadatakit_core::{HttpMetadataApi, MetadataApi, MetadataBody, MetadataConfig};

fn plain_http_api() -> HttpMetadataApi {
    let config = MetadataConfig::from_json(r#"{"base_url":"http://127.0.0.1:1/metadata"}"#)
        .expect("config parses");
    HttpMetadataApi::new(&config)
}

#[tokio::test]
async fn test_fetch_over_plain_http_is_refused() {
    let err = plain_http_api().fetch_entry("1Addr").await.unwrap_err();
    assert_eq!(err.status, None);
    assert_eq!(err.url, "http://127.0.0.1:1/metadata/1Addr");
    assert!(err.error.contains("https required"));
}

#[tokio::test]
async fn test_put_over_plain_http_is_refused() {
    let body = MetadataBody {
        version: 1,
        payload: "cA==".to_string(),
        signature: "cw==".to_string(),
        prev_magic_hash: None,
        type_id: 12,
    };
    let err = plain_http_api().put_entry("1Addr", &body).await.unwrap_err();
    assert!(err.error.contains("https required"));
    assert!(!err.is_not_found());
}
