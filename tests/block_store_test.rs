//! Block list store integration tests

mod common;

use chrono::Duration;
use common::database::{setup_test_database, store, store_with_limits};
use common::fixtures::{create_session, create_test_tag, create_test_user};
use kirakira::app_config::BlockLimits;
use kirakira::block::{BlockError, BlockKind, ErrorKind, Rule};
use kirakira::identity::Credential;
use kirakira::orm::{block_entries, unblock_audit};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Statement};

#[actix_rt::test]
async fn test_block_user_and_list() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let store = store(&db);

    let entry = store
        .add_rule(&alice.credential(), &Rule::Block { target_id: bob.id })
        .await
        .expect("Block should succeed");
    assert_eq!(entry.kind, BlockKind::Block);
    assert_eq!(entry.value, bob.uuid);
    assert_eq!(entry.operator_uuid, alice.uuid);
    assert_eq!(entry.operator_id, alice.id);

    assert_eq!(store.count_rules(&alice.uuid, BlockKind::Block).await.unwrap(), 1);
    assert_eq!(store.count_rules(&alice.uuid, BlockKind::Hide).await.unwrap(), 0);
    assert_eq!(store.count_rules(&bob.uuid, BlockKind::Block).await.unwrap(), 0);

    let page = store
        .list_rules(&alice.credential(), BlockKind::Block, 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items.len(), 1);

    let target = page.items[0].target.as_ref().expect("Target should be joined");
    assert_eq!(target.id, bob.id);
    assert_eq!(target.username, "bob");
}

#[actix_rt::test]
async fn test_duplicate_rule_conflicts() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let store = store(&db);

    store
        .add_rule(&alice.credential(), &Rule::Block { target_id: bob.id })
        .await
        .unwrap();
    let err = store
        .add_rule(&alice.credential(), &Rule::Block { target_id: bob.id })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Blocking and hiding the same user are separate rules.
    store
        .add_rule(&alice.credential(), &Rule::Hide { target_id: bob.id })
        .await
        .expect("Hide is a different kind");

    // Another operator may block the same target.
    let carol = create_test_user(&db, "carol").await.unwrap();
    store
        .add_rule(&carol.credential(), &Rule::Block { target_id: bob.id })
        .await
        .expect("Different operator");

    assert_eq!(block_entries::Entity::find().count(&db).await.unwrap(), 3);
}

#[actix_rt::test]
async fn test_self_block_rejected() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    let err = store
        .add_rule(&alice.credential(), &Rule::Block { target_id: alice.id })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = store
        .add_rule(&alice.credential(), &Rule::Hide { target_id: alice.id })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Invalid rule: cannot hide self");
}

#[actix_rt::test]
async fn test_unknown_target_not_found() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    let err = store
        .add_rule(&alice.credential(), &Rule::Block { target_id: 9999 })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = store
        .add_rule(&alice.credential(), &Rule::Block { target_id: 0 })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[actix_rt::test]
async fn test_bad_credentials_unauthorized() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    let err = store
        .add_rule(&alice.forged_credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::Unauthorized));

    create_session(&db, &alice.uuid, "stale", Duration::hours(-1))
        .await
        .unwrap();
    let err = store
        .add_rule(&Credential::new(alice.uuid.clone(), "stale"), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // A live token presented with someone else's UUID.
    let bob = create_test_user(&db, "bob").await.unwrap();
    let err = store
        .list_rules(&Credential::new(bob.uuid.clone(), alice.token.clone()), BlockKind::Keyword, 1, 10)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    assert_eq!(block_entries::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_capacity_per_kind() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store_with_limits(
        &db,
        BlockLimits {
            max_regexes: 1,
            ..BlockLimits::default()
        },
    );

    store
        .add_rule(&alice.credential(), &Rule::Regex("^spam".into()))
        .await
        .unwrap();
    let err = store
        .add_rule(&alice.credential(), &Rule::Regex("eggs$".into()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BlockError::Capacity {
            kind: BlockKind::Regex,
            cap: 1
        }
    ));

    // Other kinds have their own caps.
    store
        .add_rule(&alice.credential(), &Rule::Keyword("eggs".into()))
        .await
        .expect("Keyword cap is separate");

    // Freeing a slot lets a new rule in.
    store
        .remove_rule(&alice.credential(), &Rule::Regex("^spam".into()))
        .await
        .unwrap();
    store
        .add_rule(&alice.credential(), &Rule::Regex("eggs$".into()))
        .await
        .expect("Slot was freed");
}

#[actix_rt::test]
async fn test_unsafe_patterns_rejected() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    for pattern in ["(a+)+", "(x*)*y", "([a-z]+)*", "(unclosed"] {
        let err = store
            .add_rule(&alice.credential(), &Rule::Regex(pattern.into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{} should be rejected", pattern);
    }

    let err = store
        .add_rule(&alice.credential(), &Rule::Regex("a".repeat(31)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = store
        .add_rule(&alice.credential(), &Rule::Keyword("(a+)+".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("unsafe keyword"), "{}", err);

    let err = store
        .add_rule(&alice.credential(), &Rule::Keyword("<script>".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(block_entries::Entity::find().count(&db).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_keyword_repetition_limit() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store_with_limits(
        &db,
        BlockLimits {
            regex_max_repetitions: 2,
            ..BlockLimits::default()
        },
    );

    store
        .add_rule(&alice.credential(), &Rule::Keyword("why?".into()))
        .await
        .unwrap();

    let err = store
        .add_rule(&alice.credential(), &Rule::Keyword("who? what? why?".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("unsafe keyword"), "{}", err);
    assert_eq!(store.count_rules(&alice.uuid, BlockKind::Keyword).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_remove_writes_audit() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let store = store(&db);

    let entry = store
        .add_rule(&alice.credential(), &Rule::Hide { target_id: bob.id })
        .await
        .unwrap();

    let record = store
        .remove_rule(&alice.credential(), &Rule::Hide { target_id: bob.id })
        .await
        .expect("Removal should succeed");
    assert_eq!(record.kind, BlockKind::Hide);
    assert_eq!(record.value, bob.uuid);
    assert_eq!(record.operator_uuid, alice.uuid);
    assert_eq!(record.created_at, entry.created_at);
    assert_eq!(record.reversing_operator_uuid, alice.uuid);
    assert_eq!(record.reversing_operator_id, alice.id);
    assert!(record.reversed_at >= entry.created_at);

    assert_eq!(block_entries::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(unblock_audit::Entity::find().count(&db).await.unwrap(), 1);

    // Nothing left to remove; the ledger is untouched.
    let err = store
        .remove_rule(&alice.credential(), &Rule::Hide { target_id: bob.id })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(unblock_audit::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_failed_remove_keeps_rule() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    store
        .add_rule(&alice.credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap();

    // The ledger insert fails, so the delete must not stick either.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "DROP TABLE unblock_audit".to_owned(),
    ))
    .await
    .unwrap();

    let err = store
        .remove_rule(&alice.credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, BlockError::Store(_)));
    assert_eq!(err.to_string(), "Block list storage is unavailable");

    assert_eq!(block_entries::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(store.count_rules(&alice.uuid, BlockKind::Keyword).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_remove_only_own_rules() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let store = store(&db);

    store
        .add_rule(&alice.credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap();

    let err = store
        .remove_rule(&bob.credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(store.count_rules(&alice.uuid, BlockKind::Keyword).await.unwrap(), 1);

    let err = store
        .remove_rule(&alice.forged_credential(), &Rule::Keyword("spoiler".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[actix_rt::test]
async fn test_list_pagination() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let store = store(&db);

    for keyword in ["one", "two", "three"] {
        store
            .add_rule(&alice.credential(), &Rule::Keyword(keyword.into()))
            .await
            .unwrap();
    }

    let first = store
        .list_rules(&alice.credential(), BlockKind::Keyword, 1, 2)
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.page, 1);
    assert_eq!(first.page_size, 2);
    let values: Vec<&str> = first.items.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["three", "two"]);

    let second = store
        .list_rules(&alice.credential(), BlockKind::Keyword, 2, 2)
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].value, "one");
    assert!(second.items[0].target.is_none());

    // Out-of-range arguments are clamped.
    let clamped = store
        .list_rules(&alice.credential(), BlockKind::Keyword, 0, 10_000)
        .await
        .unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.page_size, BlockLimits::default().max_page_size);
    assert_eq!(clamped.items.len(), 3);
}

#[actix_rt::test]
async fn test_tag_rules_join_names() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let tag = create_test_tag(&db, "horror").await.unwrap();
    let store = store(&db);

    let entry = store
        .add_rule(&alice.credential(), &Rule::Tag(tag.id))
        .await
        .unwrap();
    assert_eq!(entry.value, tag.id.to_string());

    let page = store
        .list_rules(&alice.credential(), BlockKind::Tag, 1, 10)
        .await
        .unwrap();
    let joined = page.items[0].tag.as_ref().expect("Tag should be joined");
    assert_eq!(joined.id, tag.id);
    assert_eq!(joined.name, "horror");

    let err = store
        .add_rule(&alice.credential(), &Rule::Tag(-3))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[actix_rt::test]
async fn test_reversal_history() {
    let db = setup_test_database().await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bob = create_test_user(&db, "bob").await.unwrap();
    let store = store(&db);

    store
        .add_rule(&alice.credential(), &Rule::Block { target_id: bob.id })
        .await
        .unwrap();
    store
        .add_rule(&alice.credential(), &Rule::Regex("^ad".into()))
        .await
        .unwrap();
    store
        .remove_rule(&alice.credential(), &Rule::Block { target_id: bob.id })
        .await
        .unwrap();
    store
        .remove_rule(&alice.credential(), &Rule::Regex("^ad".into()))
        .await
        .unwrap();

    let all = store
        .reversal_history(&alice.credential(), None, 1, 10)
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.items[0].kind, BlockKind::Regex);
    assert_eq!(all.items[1].kind, BlockKind::Block);

    let blocks = store
        .reversal_history(&alice.credential(), Some(BlockKind::Block), 1, 10)
        .await
        .unwrap();
    assert_eq!(blocks.total, 1);
    assert_eq!(blocks.items[0].value, bob.uuid);

    let none = store
        .reversal_history(&bob.credential(), None, 1, 10)
        .await
        .unwrap();
    assert_eq!(none.total, 0);
}
