use fsl_core::model::UserId;
use serde_json::{Value, json};
use storage::repository::{DocumentPath, DocumentStore, Fields, WriteMode};
use storage::sqlite::SqliteRepository;

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_merge_write_preserves_untouched_fields() {
    let repo = connect("memdb_merge").await;
    let path = DocumentPath::progress(&UserId::new("u1"), "numbers");

    assert!(!repo.document_exists(&path).await.unwrap());
    assert!(repo.read_document(&path).await.unwrap().is_none());

    repo.write_document(
        &path,
        fields(json!({"learnedItems": [], "total": 10, "lastViewedItem": "1"})),
        WriteMode::Merge,
    )
    .await
    .unwrap();
    repo.write_document(
        &path,
        fields(json!({"learnedItems": ["1"], "completed": 1, "lastViewedItem": "2"})),
        WriteMode::Merge,
    )
    .await
    .unwrap();

    assert!(repo.document_exists(&path).await.unwrap());
    let doc = repo.read_document(&path).await.unwrap().unwrap();
    assert_eq!(doc["total"], 10);
    assert_eq!(doc["completed"], 1);
    assert_eq!(doc["learnedItems"], json!(["1"]));
    assert_eq!(doc["lastViewedItem"], "2");
}

#[tokio::test]
async fn sqlite_replace_write_drops_old_fields() {
    let repo = connect("memdb_replace").await;
    let path = DocumentPath::progress(&UserId::new("u2"), "numbers_quiz");

    repo.write_document(&path, fields(json!({"attempts": 2, "bestScore": 8})), WriteMode::Merge)
        .await
        .unwrap();
    repo.write_document(&path, fields(json!({"attempts": 3})), WriteMode::Replace)
        .await
        .unwrap();

    let doc = repo.read_document(&path).await.unwrap().unwrap();
    assert_eq!(doc["attempts"], 3);
    assert!(doc.get("bestScore").is_none());
}

#[tokio::test]
async fn sqlite_migrate_is_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    let path = DocumentPath::progress(&UserId::new("u3"), "alphabet");
    repo.write_document(&path, fields(json!({"total": 26})), WriteMode::Merge)
        .await
        .unwrap();
    assert!(repo.document_exists(&path).await.unwrap());
}
