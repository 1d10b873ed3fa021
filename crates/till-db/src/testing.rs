//! Fixtures shared by the repository tests.

use std::path::PathBuf;

use till_core::{NewInventoryItem, NewMember};

use crate::{Database, DbConfig};

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file-backed database with several connections and the default retry
/// budget, for tests that need real concurrent writers. Remove it with
/// [`remove_db_files`].
pub(crate) async fn file_db() -> (Database, PathBuf) {
    file_db_with(|config| config).await
}

pub(crate) async fn file_db_with(
    configure: impl FnOnce(DbConfig) -> DbConfig,
) -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("till-test-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(configure(DbConfig::new(&path).max_connections(4)))
        .await
        .unwrap();
    (db, path)
}

pub(crate) async fn remove_db_files(db: Database, path: PathBuf) {
    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub(crate) fn new_item(sku: &str, stock: i64) -> NewInventoryItem {
    NewInventoryItem {
        sku: sku.to_string(),
        name: format!("Item {sku}"),
        category: "Grocery".to_string(),
        brand: "House".to_string(),
        price_cents: 250,
        stock_quantity: stock,
        reorder_point: 5,
    }
}

pub(crate) fn new_member(name: &str) -> NewMember {
    NewMember {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "0812345678".to_string(),
        tier: "Bronze".to_string(),
    }
}
