//! Unit tests for CLI commands.

use super::*;
use camino::Utf8PathBuf;
use parcel_config::{SiteKind, SiteSection};
use parcel_core::Op;
use std::fs;
use tempfile::TempDir;

/// Create a temporary directory for testing
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

fn shared_site(temp: &TempDir) -> SiteSection {
    SiteSection {
        name: "shared".to_string(),
        kind: SiteKind::Filesystem,
        path: Some(Utf8PathBuf::from_path_buf(temp.path().join("shared")).unwrap()),
        url: None,
        retries: None,
    }
}

/// A quiet command context with its own repository under `temp`
fn create_test_context(temp: &TempDir, repository: &str, config: ParcelToml) -> CommandContext {
    CommandContext::with_config(
        temp.path().to_path_buf(),
        OutputHandler::quiet(),
        config,
        &temp.path().join(repository),
    )
    .unwrap()
}

fn write_project(temp: &TempDir, marker: &str) -> PathBuf {
    let dir = temp.path().join("project");
    fs::create_dir_all(dir.join("lib")).unwrap();
    fs::write(dir.join("lib").join("data.txt"), marker).unwrap();
    dir
}

fn query(id: &str, op: Op, target: &str) -> QueryArgs {
    QueryArgs {
        id: id.to_string(),
        op,
        target: target.to_string(),
    }
}

#[test]
fn test_suggest_similar_command() {
    let known = vec!["openssl".to_string(), "zlib".to_string(), "boost".to_string()];

    assert_eq!(suggest_similar_command("openssl", &known), Some("openssl".to_string()));
    assert_eq!(suggest_similar_command("opensl", &known), Some("openssl".to_string()));
    assert_eq!(suggest_similar_command("zlb", &known), Some("zlib".to_string()));
    assert_eq!(suggest_similar_command("xyz", &known), None);
    assert_eq!(suggest_similar_command("boost", &[]), None);
}

#[test]
fn test_edit_distance() {
    assert_eq!(edit_distance("", ""), 0);
    assert_eq!(edit_distance("", "abc"), 3);
    assert_eq!(edit_distance("abc", ""), 3);
    assert_eq!(edit_distance("abc", "abc"), 0);
    assert_eq!(edit_distance("abc", "ab"), 1);
    assert_eq!(edit_distance("abc", "abcd"), 1);
    assert_eq!(edit_distance("kitten", "sitting"), 3);
}

#[tokio::test]
async fn test_pack_list_hash_extract() {
    let temp = create_temp_dir();
    let ctx = create_test_context(&temp, "repo", ParcelToml::default());
    let project = write_project(&temp, "hello");

    pack::execute(&project, "tool", "1.0.0", Some(ArchiveType::TarGz), &ctx)
        .await
        .unwrap();
    pack::execute(&project, "tool", "1.1.0", None, &ctx).await.unwrap();

    let repository = ctx.resolver.repository();
    assert_eq!(repository.versions("tool").unwrap(), ["1.0.0", "1.1.0"]);
    let packed = repository.find("tool", "1.1.0").unwrap().unwrap();
    assert_eq!(packed.archive_type(), ArchiveType::Zip);

    list::execute(None, &ctx).await.unwrap();
    list::execute(Some("tool"), &ctx).await.unwrap();
    hash::execute("tool", "1.0.0", &ctx).await.unwrap();

    extract::execute("tool", "1.0.0", Path::new("out"), &ctx).await.unwrap();
    assert_eq!(
        fs::read_to_string(temp.path().join("out").join("lib").join("data.txt")).unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn test_pack_rejects_path_like_id_and_repack() {
    let temp = create_temp_dir();
    let ctx = create_test_context(&temp, "repo", ParcelToml::default());
    let project = write_project(&temp, "x");

    let err = pack::execute(&project, "../evil", "1.0.0", None, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::UnsafePath { .. }));
    assert!(!temp.path().join("evil").exists());

    pack::execute(&project, "tool", "1.0.0", Some(ArchiveType::Zip), &ctx)
        .await
        .unwrap();
    let err = pack::execute(&project, "tool", "1.0.0", Some(ArchiveType::TarGz), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::BundleExists { .. }));

    let bundle = ctx.resolver.repository().find("tool", "1.0.0").unwrap().unwrap();
    assert_eq!(bundle.archive_type(), ArchiveType::Zip);
}

#[tokio::test]
async fn test_default_archive_from_config() {
    let temp = create_temp_dir();
    let mut config = ParcelToml::default();
    config.repository.default_archive = Some("tar.bz2".to_string());
    let ctx = create_test_context(&temp, "repo", config);
    let project = write_project(&temp, "bz");

    pack::execute(&project, "tool", "2.0.0", None, &ctx).await.unwrap();

    let bundle = ctx.resolver.repository().find("tool", "2.0.0").unwrap().unwrap();
    assert_eq!(bundle.archive_type(), ArchiveType::TarBz2);
}

#[tokio::test]
async fn test_publish_then_fetch_from_other_repository() {
    let temp = create_temp_dir();
    let config = ParcelToml {
        sites: vec![shared_site(&temp)],
        ..ParcelToml::default()
    };
    let project = write_project(&temp, "shared data");

    let producer = create_test_context(&temp, "producer", config.clone());
    publish::execute(&project, "tool", "3.1.0", "shared", None, &producer)
        .await
        .unwrap();

    let consumer = create_test_context(&temp, "consumer", config);
    fetch::execute(query("tool", Op::GreaterEq, "3.0.0"), &consumer)
        .await
        .unwrap();

    let fetched = consumer.resolver.repository().find("tool", "3.1.0").unwrap();
    assert!(fetched.is_some());

    resolve::execute(query("tool", Op::Range, "3.0,4.0"), true, false, &consumer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_publish_to_unknown_site_fails() {
    let temp = create_temp_dir();
    let ctx = create_test_context(&temp, "repo", ParcelToml::default());
    let project = write_project(&temp, "x");

    let err = publish::execute(&project, "tool", "1.0.0", "missing", None, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::ConfigValidation { .. }));
}

#[tokio::test]
async fn test_unresolvable_request_is_an_error() {
    let temp = create_temp_dir();
    let ctx = create_test_context(&temp, "repo", ParcelToml::default());
    let project = write_project(&temp, "x");
    pack::execute(&project, "tool", "1.0.0", None, &ctx).await.unwrap();

    let err = resolve::execute(query("tol", Op::GreaterEq, "0.0.0"), false, false, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::ResolutionFailure { ref id, .. } if id == "tol"));

    let err = fetch::execute(query("tool", Op::GreaterEq, "2.0.0"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::ResolutionFailure { .. }));

    assert_eq!(ctx.known_ids().await, ["tool"]);
}

#[tokio::test]
async fn test_missing_bundle_errors() {
    let temp = create_temp_dir();
    let ctx = create_test_context(&temp, "repo", ParcelToml::default());

    let err = extract::execute("ghost", "1.0.0", Path::new("out"), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ParcelError::ArchiveNotFound { .. }));

    assert!(hash::execute("ghost", "1.0.0", &ctx).await.is_err());
}

#[test]
fn test_query_constraint() {
    let range = query("tool", Op::Range, "1.0:2.0").constraint().unwrap();
    assert_eq!(range.to_string(), "1.0.0..2.0.0");

    assert!(query("tool", Op::Range, "1.0").constraint().is_err());
    assert!(query("tool", Op::Less, "x.y").constraint().is_err());
}
