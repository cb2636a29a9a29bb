//! Database layer tests against a scratch database

use chrono::NaiveDate;

use super::{Database, TransactionFilter};
use crate::error::Error;
use crate::models::{NewCategory, NewChat, NewTransaction, NewUser, TransactionType, TransactionUpdate};

fn test_db() -> Database {
    Database::in_memory().expect("test database")
}

fn test_user(db: &Database, email: &str) -> i64 {
    db.create_user(&NewUser {
        email: email.to_string(),
        hashed_password: "$argon2id$test".to_string(),
        full_name: Some("Test User".to_string()),
    })
    .expect("create user")
    .id
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_tx(kind: TransactionType, amount: &str, day: &str) -> NewTransaction {
    NewTransaction {
        category_id: None,
        kind,
        amount: amount.parse().unwrap(),
        description: Some("test".to_string()),
        date: date(day),
    }
}

#[test]
fn duplicate_email_is_a_conflict() {
    let db = test_db();
    test_user(&db, "a@example.com");
    let err = db
        .create_user(&NewUser {
            email: "a@example.com".to_string(),
            hashed_password: "h".to_string(),
            full_name: None,
        })
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[test]
fn login_and_profile_updates_touch_disjoint_timestamps() {
    let db = test_db();
    let id = test_user(&db, "a@example.com");

    let fresh = db.find_user_by_id(id).unwrap();
    assert!(fresh.last_login_at.is_none());
    assert!(fresh.updated_at.is_none());

    db.touch_last_login(id).unwrap();
    let after_login = db.find_user_by_id(id).unwrap();
    assert!(after_login.last_login_at.is_some());
    assert!(after_login.updated_at.is_none());

    db.update_profile(id, Some("Renamed"), None).unwrap();
    let after_update = db.find_user_by_id(id).unwrap();
    assert!(after_update.updated_at.is_some());
    // The profile write must not clobber the login timestamp
    assert_eq!(after_update.last_login_at, after_login.last_login_at);
    assert_eq!(after_update.full_name.as_deref(), Some("Renamed"));
}

#[test]
fn default_categories_are_seeded_and_shared() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let categories = db.list_categories(user).unwrap();
    let defaults: Vec<_> = categories.iter().filter(|c| c.is_default).collect();
    assert!(!defaults.is_empty());
    assert!(defaults.iter().all(|c| c.user_id.is_none()));

    // Another user sees the same shared defaults
    let other = test_user(&db, "b@example.com");
    let other_defaults = db
        .list_categories(other)
        .unwrap()
        .iter()
        .filter(|c| c.is_default)
        .count();
    assert_eq!(defaults.len(), other_defaults);
}

#[test]
fn defaults_cannot_be_deleted_or_updated_through_the_owner_guard() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let default_id = db
        .list_categories(user)
        .unwrap()
        .iter()
        .find(|c| c.is_default)
        .unwrap()
        .id;

    assert!(matches!(
        db.soft_delete_category(default_id, user),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        db.update_category(default_id, user, Some("Hijacked"), None),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn creating_over_a_soft_deleted_category_restores_it() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let new = NewCategory {
        name: "Books".to_string(),
        kind: TransactionType::Expense,
        description: None,
    };

    let original = db.create_category(user, &new).unwrap();
    db.soft_delete_category(original.id, user).unwrap();

    let revived = db
        .create_category(
            user,
            &NewCategory {
                description: Some("again".to_string()),
                ..new.clone()
            },
        )
        .unwrap();
    // Same row came back, preserving historical links
    assert_eq!(revived.id, original.id);
    assert!(!revived.is_deleted);
    assert_eq!(revived.description.as_deref(), Some("again"));
}

#[test]
fn active_duplicate_category_is_a_conflict() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let new = NewCategory {
        name: "Books".to_string(),
        kind: TransactionType::Expense,
        description: None,
    };
    db.create_category(user, &new).unwrap();
    assert!(matches!(
        db.create_category(user, &new),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn soft_deleted_transaction_is_invisible_until_restored() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let tx = db
        .create_transaction(user, &new_tx(TransactionType::Expense, "12.34", "2024-03-01"))
        .unwrap();

    db.soft_delete_transaction(tx.id, user).unwrap();

    // Gone from normal reads
    assert!(matches!(
        db.find_transaction(tx.id, user),
        Err(Error::NotFound(_))
    ));
    assert!(db
        .list_transactions(user, &TransactionFilter::new())
        .unwrap()
        .is_empty());

    // Visible through the widened audit listing
    let mut audit = TransactionFilter::new();
    audit.include_deleted = true;
    assert_eq!(db.list_transactions(user, &audit).unwrap().len(), 1);

    // And through the restore path's dedicated lookup
    let deleted = db.find_deleted_transaction(tx.id, user).unwrap().unwrap();
    assert!(deleted.is_deleted);
    assert!(deleted.deleted_at.is_some());

    let restored = db.restore_transaction(tx.id, user).unwrap();
    assert!(!restored.is_deleted);
    assert!(restored.deleted_at.is_none());
    // Observationally identical to before the delete
    assert_eq!(restored.amount, tx.amount);
    assert_eq!(restored.date, tx.date);
    assert_eq!(restored.description, tx.description);
    assert_eq!(
        db.list_transactions(user, &TransactionFilter::new())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn double_delete_and_restore_of_active_row_have_distinct_outcomes() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let tx = db
        .create_transaction(user, &new_tx(TransactionType::Income, "5", "2024-03-01"))
        .unwrap();

    // Restoring a never-deleted row is a conflict, not a no-op
    assert!(matches!(
        db.restore_transaction(tx.id, user),
        Err(Error::Conflict(_))
    ));

    db.soft_delete_transaction(tx.id, user).unwrap();
    // A second delete looks identical to "not found": deleted rows are
    // invisible to the delete guard
    assert!(matches!(
        db.soft_delete_transaction(tx.id, user),
        Err(Error::NotFound(_))
    ));

    db.restore_transaction(tx.id, user).unwrap();
    assert!(matches!(
        db.restore_transaction(tx.id, user),
        Err(Error::Conflict(_))
    ));
}

#[test]
fn other_users_rows_are_invisible() {
    let db = test_db();
    let alice = test_user(&db, "alice@example.com");
    let bob = test_user(&db, "bob@example.com");
    let tx = db
        .create_transaction(alice, &new_tx(TransactionType::Expense, "9", "2024-03-01"))
        .unwrap();

    assert!(matches!(
        db.find_transaction(tx.id, bob),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        db.soft_delete_transaction(tx.id, bob),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn transaction_type_must_match_category_type() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let food = db
        .create_category(
            user,
            &NewCategory {
                name: "Food".to_string(),
                kind: TransactionType::Expense,
                description: None,
            },
        )
        .unwrap();

    let mut mismatched = new_tx(TransactionType::Income, "100", "2024-03-01");
    mismatched.category_id = Some(food.id);
    assert!(matches!(
        db.create_transaction(user, &mismatched),
        Err(Error::Validation(_))
    ));

    // Same rule on the update path
    let tx = db
        .create_transaction(user, &new_tx(TransactionType::Income, "100", "2024-03-01"))
        .unwrap();
    let changes = TransactionUpdate {
        category_id: Some(Some(food.id)),
        ..Default::default()
    };
    assert!(matches!(
        db.update_transaction(tx.id, user, &changes),
        Err(Error::Validation(_))
    ));
}

#[test]
fn amounts_must_be_positive_magnitudes() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    assert!(matches!(
        db.create_transaction(user, &new_tx(TransactionType::Expense, "0", "2024-03-01")),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        db.create_transaction(user, &new_tx(TransactionType::Expense, "-5", "2024-03-01")),
        Err(Error::Validation(_))
    ));
}

#[test]
fn date_filters_are_inclusive_and_inverted_ranges_match_nothing() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    for day in ["2024-03-01", "2024-03-02", "2024-03-03"] {
        db.create_transaction(user, &new_tx(TransactionType::Expense, "1", day))
            .unwrap();
    }

    let filter = TransactionFilter::new().between(date("2024-03-01"), date("2024-03-02"));
    assert_eq!(db.list_transactions(user, &filter).unwrap().len(), 2);

    let inverted = TransactionFilter::new().between(date("2024-03-03"), date("2024-03-01"));
    assert!(db.list_transactions(user, &inverted).unwrap().is_empty());
}

#[test]
fn category_delete_does_not_cascade_to_transactions() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    let cat = db
        .create_category(
            user,
            &NewCategory {
                name: "Food".to_string(),
                kind: TransactionType::Expense,
                description: None,
            },
        )
        .unwrap();
    let mut tx = new_tx(TransactionType::Expense, "30", "2024-03-01");
    tx.category_id = Some(cat.id);
    let tx = db.create_transaction(user, &tx).unwrap();

    db.soft_delete_category(cat.id, user).unwrap();

    // The transaction still exists, still references the category id
    let still_there = db.find_transaction(tx.id, user).unwrap();
    assert_eq!(still_there.category_id, Some(cat.id));
}

#[test]
fn statistics_exclude_deleted_rows() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    db.create_transaction(user, &new_tx(TransactionType::Income, "3000", "2024-03-01"))
        .unwrap();
    let doomed = db
        .create_transaction(user, &new_tx(TransactionType::Expense, "1000", "2024-03-02"))
        .unwrap();
    db.create_transaction(user, &new_tx(TransactionType::Expense, "500", "2024-03-03"))
        .unwrap();

    db.soft_delete_transaction(doomed.id, user).unwrap();

    let stats = db
        .transaction_statistics(user, &TransactionFilter::new())
        .unwrap();
    assert_eq!(stats.total_income, "3000".parse().unwrap());
    assert_eq!(stats.total_expense, "500".parse().unwrap());
    assert_eq!(stats.balance, "2500".parse().unwrap());
    assert_eq!(stats.transaction_count, 2);
}

#[test]
fn chat_history_is_capped_and_hard_deleted() {
    let db = test_db();
    let user = test_user(&db, "a@example.com");
    for i in 0..3 {
        db.insert_chat(
            user,
            &NewChat {
                question: format!("q{}", i),
                response: "a".to_string(),
                context_summary: None,
                was_successful: true,
                error_message: None,
            },
        )
        .unwrap();
    }

    let history = db.list_chats(user, 100).unwrap();
    assert_eq!(history.len(), 3);
    // Newest first
    assert_eq!(history[0].question, "q2");

    db.delete_chat(history[0].id, user).unwrap();
    assert!(matches!(
        db.delete_chat(history[0].id, user),
        Err(Error::NotFound(_))
    ));
    assert_eq!(db.list_chats(user, 100).unwrap().len(), 2);
}
