//! Integration tests for the user directory

use tempfile::TempDir;
use user_rs::{Config, UserStore};

async fn open_in(dir: &TempDir) -> UserStore {
    let url = format!("sqlite://{}", dir.path().join("users.db").display());
    UserStore::open(&url).await.unwrap()
}

#[tokio::test]
async fn test_ids_stable_across_restarts() {
    let dir = TempDir::new().unwrap();
    let roster = Config::default().directory.users;

    let first = {
        let store = open_in(&dir).await;
        store.seed(&roster).await.unwrap();
        store.all().await.unwrap()
    };

    let store = open_in(&dir).await;
    assert_eq!(store.seed(&roster).await.unwrap(), 0);
    assert_eq!(store.all().await.unwrap(), first);
}

#[tokio::test]
async fn test_default_roster_lookup() {
    let store = UserStore::open("sqlite::memory:").await.unwrap();
    store
        .seed(&Config::default().directory.users)
        .await
        .unwrap();

    let walter = store.by_name("Walter").await.unwrap().unwrap();
    assert_eq!(walter.id, 19);

    let users = store.all().await.unwrap();
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, (1..=19).collect::<Vec<_>>());
}
