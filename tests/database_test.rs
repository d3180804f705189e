//! Flows against a real Postgres.
//!
//! Run with `DATABASE_URL` pointing at a server where the test user may
//! create databases, then `cargo test -- --ignored`.

mod helpers;

use axum::http::header::{CONTENT_DISPOSITION, ETAG};
use axum::http::StatusCode;
use docvault_backend::dto::{DocumentInput, FolderRequest, TagRequest, Upload};
use docvault_backend::error::AppError;
use docvault_backend::models::ActivityType;
use docvault_backend::permissions::Requester;
use docvault_backend::repositories::{ActivityFilter, DocumentFilter, FolderFilter};
use helpers::*;
use serde_json::json;
use sqlx::{PgPool, Row};

fn requester(user: &docvault_backend::models::User) -> Requester {
    Requester {
        id: user.id,
        privileged: user.is_privileged(),
    }
}

fn folder_named(name: &str, parent_id: Option<uuid::Uuid>) -> FolderRequest {
    FolderRequest {
        name: Some(name.to_string()),
        parent_id: Some(parent_id),
        ..FolderRequest::default()
    }
}

// ============================================================================
// Schema
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_migrations_ran(pool: PgPool) {
    let tables = [
        "users",
        "folders",
        "folder_shared_users",
        "tags",
        "documents",
        "document_tags",
        "document_shared_users",
        "document_versions",
        "document_activities",
        "comments",
    ];

    for table in tables {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// Documents and versions
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_upload_creates_first_version_and_activity(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;

    let document = app.upload(&alice, "Budget", "q1 numbers").await;
    assert_eq!(document.version, 1);
    assert_eq!(document.file_type, "txt");
    assert_eq!(document.file_size, 10);
    assert_eq!(document.checksum.len(), 64);
    assert!(document.file.starts_with("/media/documents/"));

    let detail = app.state.documents.get(requester(&alice), document.id).await.unwrap();
    assert_eq!(detail.versions.len(), 1);
    assert_eq!(detail.versions[0].comment, "Initial version");
    assert_eq!(detail.versions[0].created_by.id, alice.id);
    assert_eq!(detail.activities.len(), 1);
    assert_eq!(detail.activities[0].activity_type, "created");
    assert_eq!(detail.activities[0].ip_address.as_deref(), Some("127.0.0.1"));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_new_file_bumps_version(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let document = app.upload(&alice, "Plan", "draft").await;

    let input = DocumentInput {
        file: Some(Upload {
            file_name: "plan.txt".into(),
            bytes: b"final version".to_vec(),
        }),
        ..DocumentInput::default()
    };
    let updated = app
        .state
        .documents
        .update(&actor(&alice), document.id, input, true)
        .await
        .unwrap();

    assert_eq!(updated.document.version, 2);
    assert_eq!(updated.document.title, "Plan");
    assert_ne!(updated.document.checksum, document.checksum);
    let versions: Vec<i32> = updated.versions.iter().map(|v| v.version).collect();
    assert_eq!(versions, vec![2, 1]);
    assert_eq!(updated.versions[0].comment, "Version 2");
    assert!(updated
        .activities
        .iter()
        .any(|a| a.activity_type == "updated" && a.description == "Updated to version 2"));

    // Metadata-only change keeps the version
    let input = DocumentInput {
        description: Some("Reviewed".into()),
        ..DocumentInput::default()
    };
    let patched = app
        .state
        .documents
        .update(&actor(&alice), document.id, input, true)
        .await
        .unwrap();
    assert_eq!(patched.document.version, 2);
    assert_eq!(patched.document.description, "Reviewed");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_put_requires_title(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let document = app.upload(&alice, "Memo", "hello").await;

    let err = app
        .state
        .documents
        .update(&actor(&alice), document.id, DocumentInput::default(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_private_documents_are_hidden(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Secret", "classified").await;

    let err = app.state.documents.get(requester(&bob), document.id).await.unwrap_err();
    assert!(err.is_not_found());

    let listed = app
        .state
        .documents
        .list(requester(&bob), &DocumentFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_shared_documents_are_read_only(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Shared", "contents").await;

    app.state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id], true)
        .await
        .unwrap();

    let detail = app.state.documents.get(requester(&bob), document.id).await.unwrap();
    assert_eq!(detail.shared_users.len(), 1);
    assert_eq!(detail.shared_users[0].username, "bob");

    let input = DocumentInput {
        title: Some("Hijacked".into()),
        ..DocumentInput::default()
    };
    let err = app
        .state
        .documents
        .update(&actor(&bob), document.id, input, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app.state.documents.delete(&actor(&bob), document.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Shared),
        ..ActivityFilter::default()
    };
    let shared = app.state.activities.list(requester(&alice), &filter).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].description, "Shared with 1 users");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_admin_can_edit_any_document(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let admin = app.create_admin("root").await;
    let document = app.upload(&alice, "Report", "body").await;

    let input = DocumentInput {
        is_public: Some(true),
        ..DocumentInput::default()
    };
    let updated = app
        .state
        .documents
        .update(&actor(&admin), document.id, input, true)
        .await
        .unwrap();
    assert!(updated.document.is_public);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_keeps_unlinked_activity(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let admin = app.create_admin("root").await;
    let document = app.upload(&alice, "Obsolete", "old").await;

    app.state.documents.delete(&actor(&alice), document.id).await.unwrap();

    let err = app.state.documents.get(requester(&alice), document.id).await.unwrap_err();
    assert!(err.is_not_found());

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Deleted),
        ..ActivityFilter::default()
    };
    let deleted = app.state.activities.list(requester(&admin), &filter).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].document, None);
    assert_eq!(deleted[0].description, "Deleted document: Obsolete");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_search_and_ordering(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    app.upload(&alice, "Annual Report", "a").await;
    app.upload(&alice, "Meeting Notes", "bb").await;
    app.upload(&alice, "Report Draft", "ccc").await;

    let filter = DocumentFilter {
        search: docvault_backend::repositories::filters::search_terms(Some("report")),
        ordering: docvault_backend::repositories::filters::parse_ordering(
            Some("-file_size"),
            docvault_backend::repositories::document_repository::DOCUMENT_ORDERING_FIELDS,
        ),
        ..DocumentFilter::default()
    };
    let titles: Vec<String> = app
        .state
        .documents
        .list(requester(&alice), &filter)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.title)
        .collect();
    assert_eq!(titles, vec!["Report Draft", "Annual Report"]);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_version_download_is_named_and_logged(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Plan", "draft").await;
    let updated = app.replace_file(&alice, document.id, "final").await;
    app.state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id], true)
        .await
        .unwrap();

    let first = updated.versions.iter().find(|v| v.version == 1).unwrap();
    let download = app.state.versions.download(&actor(&bob), first.id).await.unwrap();
    assert_eq!(download.bytes, b"draft".to_vec());
    assert_eq!(download.checksum, first.checksum);

    let stored_name = first.file.rsplit('/').next().unwrap();
    let stem = stored_name.trim_end_matches(".txt");
    assert_eq!(download.file_name, format!("{}_v1.txt", stem));

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Accessed),
        ..ActivityFilter::default()
    };
    let accessed = app.state.activities.list(requester(&alice), &filter).await.unwrap();
    assert_eq!(accessed.len(), 1);
    assert_eq!(accessed[0].user.id, bob.id);
    assert_eq!(accessed[0].document, Some(document.id));
    assert_eq!(accessed[0].description, "Downloaded document version 1");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_version_list_orders_by_version(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;

    let revised = app.upload(&alice, "Revised", "one").await;
    app.replace_file(&alice, revised.id, "two").await;
    let fresh = app.upload(&alice, "Fresh", "only").await;

    let listed: Vec<(uuid::Uuid, i32)> = app
        .state
        .versions
        .list(requester(&alice))
        .await
        .unwrap()
        .into_iter()
        .map(|v| (v.document, v.version))
        .collect();
    assert_eq!(
        listed,
        vec![(revised.id, 2), (fresh.id, 1), (revised.id, 1)]
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_document_unshare_is_logged(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let carol = app.create_user("carol").await;
    let document = app.upload(&alice, "Roster", "names").await;

    app.state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id, carol.id], true)
        .await
        .unwrap();
    app.state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id], false)
        .await
        .unwrap();

    let err = app.state.documents.get(requester(&bob), document.id).await.unwrap_err();
    assert!(err.is_not_found());
    let detail = app.state.documents.get(requester(&carol), document.id).await.unwrap();
    assert_eq!(detail.shared_users.len(), 1);
    assert_eq!(detail.shared_users[0].id, carol.id);

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Unshared),
        ..ActivityFilter::default()
    };
    let unshared = app.state.activities.list(requester(&alice), &filter).await.unwrap();
    assert_eq!(unshared.len(), 1);
    assert_eq!(unshared[0].description, "Unshared from 1 users");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_share_with_unknown_user_changes_nothing(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Ledger", "rows").await;
    let stranger = uuid::Uuid::new_v4();

    let err = app
        .state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id, stranger], true)
        .await
        .unwrap_err();
    match err {
        AppError::Validation(msg) => {
            assert!(msg.starts_with("user_ids:"));
            assert!(msg.contains(&stranger.to_string()));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let err = app.state.documents.get(requester(&bob), document.id).await.unwrap_err();
    assert!(err.is_not_found());

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Shared),
        ..ActivityFilter::default()
    };
    let shared = app.state.activities.list(requester(&alice), &filter).await.unwrap();
    assert!(shared.is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_removes_every_version_file(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let document = app.upload(&alice, "Drafts", "v1").await;
    app.replace_file(&alice, document.id, "v2").await;

    let files = app.stored_files(document.id).await;
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.exists()));

    app.state.documents.delete(&actor(&alice), document.id).await.unwrap();
    assert!(files.iter().all(|f| !f.exists()));
}

// ============================================================================
// Folders
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_folder_tree(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let folders = &app.state.folders;

    let projects = folders.create(requester(&alice), &folder_named("Projects", None)).await.unwrap();
    let alpha = folders
        .create(requester(&alice), &folder_named("Alpha", Some(projects.id)))
        .await
        .unwrap();
    assert_eq!(alpha.full_path, "Projects/Alpha");
    assert_eq!(alpha.parent, Some(projects.id));

    // Same name under the same parent
    let err = folders
        .create(requester(&alice), &folder_named("Alpha", Some(projects.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A folder may not move under its own descendant
    let request = FolderRequest {
        parent_id: Some(Some(alpha.id)),
        ..FolderRequest::default()
    };
    let err = folders
        .update(requester(&alice), projects.id, &request, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let contents = folders.contents(requester(&alice), projects.id).await.unwrap();
    assert_eq!(contents.subfolders.len(), 1);
    assert!(contents.documents.is_empty());

    let listed = folders
        .list(
            requester(&alice),
            &FolderFilter {
                parent_id: Some(projects.id),
                ..FolderFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Alpha");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_moves_cannot_form_cycle(pool: PgPool) {
    let app = TestApp::from_pool(pool.clone());
    let alice = app.create_user("alice").await;

    for round in 0..20 {
        let folders = &app.state.folders;
        let a = folders
            .create(requester(&alice), &folder_named(&format!("A{}", round), None))
            .await
            .unwrap();
        let b = folders
            .create(requester(&alice), &folder_named(&format!("B{}", round), None))
            .await
            .unwrap();

        let move_under = |child: uuid::Uuid, parent: uuid::Uuid| {
            let state = app.state.clone();
            let who = requester(&alice);
            tokio::spawn(async move {
                let request = FolderRequest {
                    parent_id: Some(Some(parent)),
                    ..FolderRequest::default()
                };
                state.folders.update(who, child, &request, true).await
            })
        };
        let first = move_under(a.id, b.id);
        let second = move_under(b.id, a.id);
        let results = [first.await.unwrap(), second.await.unwrap()];

        let moved = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(moved, 1, "round {}", round);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Validation(_)))));
    }

    let cycles: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM folders f JOIN folders p ON p.id = f.parent_id WHERE p.parent_id = f.id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(cycles, 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_folder_share_and_unshare(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let folders = &app.state.folders;

    let team = folders.create(requester(&alice), &folder_named("Team", None)).await.unwrap();
    let err = folders.get(requester(&bob), team.id).await.unwrap_err();
    assert!(err.is_not_found());

    folders
        .set_sharing(requester(&alice), team.id, &[bob.id, bob.id], true)
        .await
        .unwrap();
    let detail = folders.get(requester(&bob), team.id).await.unwrap();
    assert_eq!(detail.shared_users.len(), 1);
    assert_eq!(detail.shared_users[0].username, "bob");

    // Shared folders are read-only for the recipient
    let rename = FolderRequest {
        name: Some("Bob's".into()),
        ..FolderRequest::default()
    };
    let err = folders.update(requester(&bob), team.id, &rename, true).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = folders
        .set_sharing(requester(&bob), team.id, &[alice.id], false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = folders
        .set_sharing(requester(&alice), team.id, &[uuid::Uuid::new_v4()], true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    folders
        .set_sharing(requester(&alice), team.id, &[bob.id], false)
        .await
        .unwrap();
    let err = folders.get(requester(&bob), team.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_folder_delete_cascades(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let folders = &app.state.folders;

    let archive = folders.create(requester(&alice), &folder_named("Archive", None)).await.unwrap();
    let input = DocumentInput {
        title: Some("Old".into()),
        folder_id: Some(Some(archive.id)),
        file: Some(Upload {
            file_name: "old.pdf".into(),
            bytes: b"%PDF".to_vec(),
        }),
        ..DocumentInput::default()
    };
    let document = app.state.documents.create(&actor(&alice), input).await.unwrap();
    assert_eq!(document.folder, Some(archive.id));
    app.replace_file(&alice, document.id, "%PDF-1.7").await;
    let files = app.stored_files(document.id).await;
    assert_eq!(files.len(), 2);

    folders.delete(requester(&alice), archive.id).await.unwrap();
    assert!(files.iter().all(|f| !f.exists()));

    let err = app.state.documents.get(requester(&alice), document.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_cannot_file_into_foreign_folder(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;

    let private = app
        .state
        .folders
        .create(requester(&alice), &folder_named("Private", None))
        .await
        .unwrap();

    let err = app
        .state
        .folders
        .create(requester(&bob), &folder_named("Intruder", Some(private.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

// ============================================================================
// Comments and tags
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_comments(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Draft", "text").await;
    let other = app.upload(&alice, "Other", "text").await;

    // Through the document action: logged
    let first = app
        .state
        .documents
        .add_comment(&actor(&alice), document.id, "Needs work", None)
        .await
        .unwrap();

    // Through the comments collection: not logged
    let reply = app
        .state
        .comments
        .create(&actor(&alice), document.id, "Fixed", Some(first.id))
        .await
        .unwrap();
    assert_eq!(reply.parent, Some(first.id));

    let detail = app.state.documents.get(requester(&alice), document.id).await.unwrap();
    assert_eq!(detail.comments.len(), 2);
    let commented = detail
        .activities
        .iter()
        .filter(|a| a.activity_type == "commented")
        .count();
    assert_eq!(commented, 1);

    // Replies stay on one document
    let err = app
        .state
        .comments
        .create(&actor(&alice), other.id, "Wrong thread", Some(first.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Bob cannot see the document, so cannot comment on it
    let err = app
        .state
        .comments
        .create(&actor(&bob), document.id, "Hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Only the author edits
    app.state
        .documents
        .set_sharing(&actor(&alice), document.id, &[bob.id], true)
        .await
        .unwrap();
    let request = docvault_backend::dto::CommentUpdateRequest {
        content: Some("Edited".into()),
    };
    let err = app
        .state
        .comments
        .update(requester(&bob), first.id, &request, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_document_comments_newest_first(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let document = app.upload(&alice, "Thread", "text").await;

    for content in ["first", "second", "third"] {
        app.state
            .documents
            .add_comment(&actor(&alice), document.id, content, None)
            .await
            .unwrap();
    }

    let contents: Vec<String> = app
        .state
        .documents
        .comments(requester(&alice), document.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert_eq!(contents, vec!["third", "second", "first"]);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_tags(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let tags = &app.state.tags;

    let tag = tags
        .create(&TagRequest {
            name: Some("Quarterly Reports".into()),
        })
        .await
        .unwrap();
    assert_eq!(tag.slug, "quarterly-reports");

    let err = tags
        .create(&TagRequest {
            name: Some("Quarterly Reports".into()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let renamed = tags
        .update(
            tag.id,
            &TagRequest {
                name: Some("Finance".into()),
            },
            false,
        )
        .await
        .unwrap();
    assert_eq!(renamed.slug, "finance");

    tags.delete(tag.id).await.unwrap();
    assert!(tags.get(tag.id).await.unwrap_err().is_not_found());
}

// ============================================================================
// Accounts
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_inactive_user_cannot_login(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;

    assert!(app.state.users.obtain_pair("alice", TEST_PASSWORD).await.is_ok());
    assert!(app.state.users.obtain_pair("alice", "wrong-password").await.is_err());

    app.state.user_repo.set_active(alice.id, false).await.unwrap();
    let err = app.state.users.obtain_pair("alice", TEST_PASSWORD).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// HTTP
// ============================================================================

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_register_login_and_list(pool: PgPool) {
    let app = TestApp::from_pool(pool);

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/users",
            None,
            json!({ "username": "carol", "email": "carol@example.com", "password": "long-enough-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["username"], "carol");

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/users",
            None,
            json!({ "username": "carol", "password": "long-enough-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/jwt/create",
            None,
            json!({ "username": "carol", "password": "long-enough-password" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let pair = body_json(response).await;
    let access = pair["access"].as_str().unwrap().to_string();

    let response = app.send(get("/api/auth/users/me", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "carol");

    let response = app.send(get("/api/documents", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/jwt/refresh",
            None,
            json!({ "refresh": pair["refresh"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["access"].is_string());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_http_status_mapping(pool: PgPool) {
    let app = TestApp::from_pool(pool);
    let alice = app.create_user("alice").await;
    let bob = app.create_user("bob").await;
    let document = app.upload(&alice, "Public Notes", "shared with all").await;
    app.state
        .documents
        .update(
            &actor(&alice),
            document.id,
            DocumentInput {
                is_public: Some(true),
                ..DocumentInput::default()
            },
            true,
        )
        .await
        .unwrap();

    let bob_token = app.token_for(&bob);

    let response = app.send(get("/api/documents/not-a-uuid", Some(&bob_token))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(get(&format!("/api/documents/{}", uuid::Uuid::new_v4()), Some(&bob_token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Public: readable, not writable
    let uri = format!("/api/documents/{}", document.id);
    let response = app.send(get(&uri, Some(&bob_token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(json_request("PATCH", &uri, Some(&bob_token), json!({ "title": "Mine now" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Download as attachment and log the access
    let response = app
        .send(get(&format!("{}/download", uri), Some(&bob_token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[ETAG].to_str().unwrap(),
        format!("\"{}\"", document.checksum)
    );
    assert!(response.headers()[CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment; filename="));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"shared with all");

    let filter = ActivityFilter {
        activity_type: Some(ActivityType::Accessed),
        ..ActivityFilter::default()
    };
    let accessed = app.state.activities.list(requester(&alice), &filter).await.unwrap();
    assert_eq!(accessed.len(), 1);
    assert_eq!(accessed[0].user.id, bob.id);
}
