use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection, EntityTrait};

use engine::{
    Category, EngineError, EntryPatch, EntryStore, FilterSpec, NewEntry, PageRequest,
    SecurityEventKind, SecurityLog, SqlStore, filter_entries,
};
use migration::MigratorTrait;

async fn store_with_db() -> (SqlStore, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let store = SqlStore::builder().database(db.clone()).build();
    (store, db)
}

fn new_entry(date: (i32, u32, u32), tenant: &str, amount: f64, category: Category) -> NewEntry {
    NewEntry {
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        tenant: tenant.to_string(),
        amount,
        category,
        description: format!("{category} from {tenant}"),
    }
}

async fn insert_legacy_row(db: &DatabaseConnection, id: &str, category: &str) {
    let now = Utc::now();
    engine::entry::ActiveModel {
        id: ActiveValue::Set(id.to_string()),
        user_id: ActiveValue::Set(None),
        date: ActiveValue::Set(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()),
        tenant: ActiveValue::Set("Legacy Tenant".to_string()),
        amount: ActiveValue::Set(750.0),
        category: ActiveValue::Set(category.to_string()),
        description: ActiveValue::Set(String::new()),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    }
    .insert(db)
    .await
    .unwrap();
}

#[tokio::test]
async fn create_then_list_newest_first() {
    let (store, _db) = store_with_db().await;

    let older = store
        .create("alice", new_entry((2025, 1, 1), "John Doe", 1000.0, Category::Rent))
        .await
        .unwrap();
    let newer = store
        .create("alice", new_entry((2025, 2, 1), "Jane Smith", 200.0, Category::Maintenance))
        .await
        .unwrap();

    assert!(!older.id.is_empty());
    assert_ne!(older.id, newer.id);
    assert_eq!(older.user_id, "alice");
    assert_eq!(older.created_at, older.updated_at);

    let listed = store.get_all("alice").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
    assert_eq!(listed[1].amount, 1000.0);
    assert_eq!(listed[1].category, Category::Rent);
}

#[tokio::test]
async fn text_is_sanitized_on_write() {
    let (store, _db) = store_with_db().await;
    let mut entry = new_entry((2025, 1, 1), "  <Bob>  ", 10.0, Category::Other);
    entry.description = " <i>note</i> ".to_string();

    let created = store.create("alice", entry).await.unwrap();
    assert_eq!(created.tenant, "Bob");
    assert_eq!(created.description, "inote/i");

    store
        .update(
            "alice",
            &created.id,
            &EntryPatch {
                tenant: Some(" <Robert> ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.get("alice", &created.id).await.unwrap().tenant, "Robert");
}

#[tokio::test]
async fn missing_user_is_unauthorized() {
    let (store, _db) = store_with_db().await;
    let err = store
        .create("", new_entry((2025, 1, 1), "John", 1.0, Category::Rent))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unauthorized("User not authenticated".to_string()));
    assert!(matches!(
        store.get_all("  ").await,
        Err(EngineError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn other_owners_entries_do_not_exist() {
    let (store, _db) = store_with_db().await;
    let bobs = store
        .create("bob", new_entry((2025, 1, 1), "Bob's tenant", 500.0, Category::Rent))
        .await
        .unwrap();

    assert!(store.get_all("alice").await.unwrap().is_empty());
    assert!(matches!(
        store.get("alice", &bobs.id).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        store
            .update("alice", &bobs.id, &EntryPatch { amount: Some(1.0), ..Default::default() })
            .await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(
        store.delete("alice", &bobs.id).await,
        Err(EngineError::NotFound(_))
    ));

    assert_eq!(store.get("bob", &bobs.id).await.unwrap().amount, 500.0);
}

#[tokio::test]
async fn update_refreshes_only_updated_at() {
    let (store, _db) = store_with_db().await;
    let created = store
        .create("alice", new_entry((2025, 1, 1), "John", 1000.0, Category::Rent))
        .await
        .unwrap();
    let before = store.get("alice", &created.id).await.unwrap();

    store
        .update(
            "alice",
            &created.id,
            &EntryPatch {
                amount: Some(1250.5),
                category: Some(Category::SecurityDeposit),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = store.get("alice", &created.id).await.unwrap();
    assert_eq!(after.amount, 1250.5);
    assert_eq!(after.category, Category::SecurityDeposit);
    assert_eq!(after.tenant, before.tenant);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);

    let err = store
        .update("alice", "nope", &EntryPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("Entry not found".to_string()));
}

#[tokio::test]
async fn delete_removes_for_good() {
    let (store, _db) = store_with_db().await;
    let created = store
        .create("alice", new_entry((2025, 1, 1), "John", 1000.0, Category::Rent))
        .await
        .unwrap();

    store.delete("alice", &created.id).await.unwrap();
    assert!(store.get_all("alice").await.unwrap().is_empty());
    assert!(store.delete("alice", &created.id).await.is_err());
}

#[tokio::test]
async fn owner_less_rows_are_claimed_by_first_reader() {
    let (store, db) = store_with_db().await;
    insert_legacy_row(&db, "legacy-1", "Parking").await;

    let listed = store.get_all("alice").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user_id, "alice");
    assert_eq!(listed[0].category, Category::Other);

    let stored = engine::entry::Entity::find_by_id("legacy-1".to_string())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.user_id.as_deref(), Some("alice"));
    assert!(store.get_all("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let (store, _db) = store_with_db().await;
    let a = store
        .create("alice", new_entry((2025, 1, 1), "John", 1.0, Category::Rent))
        .await
        .unwrap();
    let b = store
        .create("alice", new_entry((2025, 1, 2), "Jane", 2.0, Category::Rent))
        .await
        .unwrap();
    let c = store
        .create("bob", new_entry((2025, 1, 3), "Joe", 3.0, Category::Rent))
        .await
        .unwrap();

    let err = store
        .bulk_delete("alice", &[a.id.clone(), c.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(store.get_all("alice").await.unwrap().len(), 2);
    assert_eq!(store.get_all("bob").await.unwrap().len(), 1);

    let err = store.bulk_delete("alice", &[]).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidInput("User ID and entry IDs are required".to_string())
    );

    store
        .bulk_delete("alice", &[a.id.clone(), b.id.clone(), a.id])
        .await
        .unwrap();
    assert!(store.get_all("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn pages_follow_the_cursor() {
    let (store, _db) = store_with_db().await;
    for day in 1..=5 {
        store
            .create("alice", new_entry((2025, 3, day), "John", day as f64, Category::Rent))
            .await
            .unwrap();
    }

    let first = store.get_page("alice", &PageRequest::first(2)).await.unwrap();
    assert!(first.has_more);
    assert_eq!(
        first.data.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![5.0, 4.0]
    );

    let cursor = first.next_cursor.unwrap();
    let second = store
        .get_page("alice", &PageRequest::after(2, cursor))
        .await
        .unwrap();
    assert_eq!(
        second.data.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![3.0, 2.0]
    );

    let third = store
        .get_page("alice", &PageRequest::after(2, second.next_cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(third.data.len(), 1);
    assert!(!third.has_more);
    assert!(third.next_cursor.is_none());

    assert!(matches!(
        store.get_page("alice", &PageRequest::first(0)).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        store.get_page("alice", &PageRequest::first(101)).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        store
            .get_page("alice", &PageRequest::after(2, "not-a-cursor"))
            .await,
        Err(EngineError::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn search_applies_filters() {
    let (store, _db) = store_with_db().await;
    store
        .create("alice", new_entry((2025, 1, 1), "John Doe", 1000.0, Category::Rent))
        .await
        .unwrap();
    store
        .create("alice", new_entry((2025, 1, 5), "Jane Smith", 300.0, Category::Maintenance))
        .await
        .unwrap();
    store
        .create("alice", new_entry((2025, 2, 1), "Jane Smith", 1200.0, Category::Rent))
        .await
        .unwrap();

    let spec = FilterSpec {
        categories: vec![Category::Rent],
        amount_min: Some(1100.0),
        ..Default::default()
    };
    let page = store
        .search("alice", &spec, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].tenant, "Jane Smith");

    let spec = FilterSpec {
        date_to: NaiveDate::from_ymd_opt(2025, 1, 31),
        search_term: Some("jane".to_string()),
        ..Default::default()
    };
    let page = store
        .search("alice", &spec, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].category, Category::Maintenance);
}

#[tokio::test]
async fn unknown_stored_category_searches_as_other() {
    let (store, db) = store_with_db().await;
    insert_legacy_row(&db, "legacy-1", "Parking").await;
    store
        .create("alice", new_entry((2025, 1, 1), "John Doe", 10.0, Category::Other))
        .await
        .unwrap();
    store
        .create("alice", new_entry((2025, 1, 2), "Jane Smith", 20.0, Category::Rent))
        .await
        .unwrap();

    let others = FilterSpec {
        categories: vec![Category::Other],
        ..Default::default()
    };
    let listed = filter_entries(&store.get_all("alice").await.unwrap(), &others);
    let page = store
        .search("alice", &others, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(page.data, listed);

    let rent = FilterSpec {
        categories: vec![Category::Rent],
        ..Default::default()
    };
    let page = store
        .search("alice", &rent, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].tenant, "Jane Smith");
}

#[tokio::test]
async fn reads_and_writes_are_audited() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let log = Arc::new(SecurityLog::new());
    let store = SqlStore::builder()
        .database(db)
        .security_log(log.clone())
        .build();

    let created = store
        .create("alice", new_entry((2025, 1, 1), "John", 1.0, Category::Rent))
        .await
        .unwrap();
    store.get_all("alice").await.unwrap();
    store.delete("alice", &created.id).await.unwrap();

    let modifications = log.by_kind(SecurityEventKind::DataModification);
    assert_eq!(modifications.len(), 2);
    assert_eq!(modifications[1].details["action"], "delete");
    assert_eq!(log.by_kind(SecurityEventKind::DataAccess).len(), 1);
    assert_eq!(log.by_user("alice").len(), 3);
}
