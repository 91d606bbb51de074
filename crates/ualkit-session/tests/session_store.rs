//! Integration tests for the file-backed session store.
//!
//! Each test gets its own temporary directory, so the tests are
//! independent and leave nothing behind.

use ualkit_session::{
    ACCOUNT_NAME_KEY, FileSessionStore, INVALIDATE_AT_KEY, LOGGED_IN_AUTH_TYPE_KEY,
    PersistedSession, SessionStore, StoreError,
};

#[tokio::test]
async fn test_open_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::open(dir.path().join("session.json"))
        .await
        .expect("missing file is not an error");

    assert_eq!(store.get(LOGGED_IN_AUTH_TYPE_KEY).await.unwrap(), None);
    // Nothing is written until the first change.
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    {
        let store = FileSessionStore::open(&path).await.unwrap();
        store.set(LOGGED_IN_AUTH_TYPE_KEY, "anchor").await.unwrap();
        store.set(ACCOUNT_NAME_KEY, "captaincrypt").await.unwrap();
    }

    let reopened = FileSessionStore::open(&path).await.unwrap();
    assert_eq!(
        reopened.get(LOGGED_IN_AUTH_TYPE_KEY).await.unwrap().as_deref(),
        Some("anchor")
    );
    assert_eq!(
        reopened.get(ACCOUNT_NAME_KEY).await.unwrap().as_deref(),
        Some("captaincrypt")
    );
}

#[tokio::test]
async fn test_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("session.json");

    let store = FileSessionStore::open(&path).await.unwrap();
    store.set(LOGGED_IN_AUTH_TYPE_KEY, "keycat").await.unwrap();

    assert!(path.exists());
}

#[tokio::test]
async fn test_remove_persists_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileSessionStore::open(&path).await.unwrap();
    store.set(LOGGED_IN_AUTH_TYPE_KEY, "anchor").await.unwrap();
    store.set(INVALIDATE_AT_KEY, "2030-01-01T00:00:00Z").await.unwrap();

    PersistedSession::purge(&store).await.unwrap();

    let reopened = FileSessionStore::open(&path).await.unwrap();
    let session = PersistedSession::load(&reopened).await.unwrap();
    assert!(!session.is_present());
    assert_eq!(session.invalidate_at, None);
}

#[tokio::test]
async fn test_corrupt_file_returns_codec_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    tokio::fs::write(&path, b"definitely not json").await.unwrap();

    let result = FileSessionStore::open(&path).await;

    assert!(
        matches!(result, Err(StoreError::Codec(_))),
        "corrupt file should surface as a codec error"
    );
}

#[tokio::test]
async fn test_empty_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    tokio::fs::write(&path, b"").await.unwrap();

    let store = FileSessionStore::open(&path).await.unwrap();

    assert_eq!(store.get(ACCOUNT_NAME_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_file_is_plain_json_map() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = FileSessionStore::open(&path).await.unwrap();
    store.set(LOGGED_IN_AUTH_TYPE_KEY, "anchor").await.unwrap();

    let text = tokio::fs::read_to_string(&path).await.unwrap();

    assert!(text.contains("\"LoggedInAuthType\": \"anchor\""), "got {text}");
    // The temp file used for the atomic write is renamed away.
    assert!(!path.with_extension("tmp").exists());
}
