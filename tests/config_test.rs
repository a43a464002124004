mod common;

use common::{create_test_dir, PRODUCT};
use granule_sync::config::{read_config, RunTarget};
use granule_sync::{ConfigError, ProductError};

async fn write_config(dir: &std::path::Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("granule-sync.json");
    tokio::fs::write(&path, json).await.unwrap();
    path
}

#[tokio::test]
async fn test_config_token_used_when_env_absent() {
    let temp = create_test_dir();
    let path = write_config(temp.path(), r#"{"token": "file-token"}"#).await;

    let config = read_config(&path).await.expect("Should read config");
    let target = config.resolve_target(PRODUCT, None).expect("Should resolve");

    assert_eq!(
        target,
        RunTarget {
            product: PRODUCT.to_string(),
            token: "file-token".to_string(),
        }
    );
}

#[tokio::test]
async fn test_run_without_any_token_is_rejected() {
    let temp = create_test_dir();
    let path = write_config(temp.path(), r#"{"dataRoot": "/data"}"#).await;

    let config = read_config(&path).await.unwrap();
    let err = config.resolve_target(PRODUCT, Some("   ")).unwrap_err();

    assert!(matches!(err, ConfigError::MissingToken));
}

#[tokio::test]
async fn test_unknown_product_rejected_before_token() {
    let temp = create_test_dir();
    let path = write_config(temp.path(), r#"{"extraProducts": ["VNP02IMG"]}"#).await;

    let config = read_config(&path).await.unwrap();

    let err = config.resolve_target("VNP02MOD", None).unwrap_err();
    assert!(matches!(err, ConfigError::Product(ProductError::Unknown { .. })));
    assert!(err.to_string().contains("VNP02IMG"));

    let target = config.resolve_target("VNP02IMG", Some("env-token")).unwrap();
    assert_eq!(target.token, "env-token");
}
