// Acceptance tests for the data-access façade.
//
// Each test drives the public `Database` API against an in-memory SQLite
// database and checks one end-to-end property of the agency workflow.

use agencydesk_core::MessageDraft;
use agencydesk_db::{
    ApprovalDecision, Database, DbError, Notification, NewApproval, NewClient, NewInvoice,
    NewLead, NewProfile, NewProject, NewReport, NewTask, OrEmpty,
};
use agencydesk_types::{ApprovalStatus, Attachment, ChangeOp, LeadStatus, Table, TaskStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_client(db: &Database, name: &str) -> String {
    db.create_client(NewClient {
        name: name.into(),
        ..Default::default()
    })
    .await
    .expect("client should insert")
    .id
}

async fn seed_project(db: &Database, client_id: &str, name: &str) -> String {
    db.create_project(NewProject {
        client_id: client_id.into(),
        name: name.into(),
        ..Default::default()
    })
    .await
    .expect("project should insert")
    .id
}

async fn count(db: &Database, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count should succeed");
    row.0
}

// ---------------------------------------------------------------------------
// Lead conversion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lead_conversion_yields_exactly_one_client() {
    let db = Database::new_in_memory().await.unwrap();
    let lead = db
        .create_lead(NewLead {
            name: "Morgan Lee".into(),
            company: Some("Lee Studio".into()),
            email: Some("morgan@leestudio.test".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    let conversion = db.convert_lead_to_client(&lead.id).await.unwrap();

    let clients = db.list_clients().await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, lead.name);
    assert_eq!(clients[0].company, lead.company);
    assert_eq!(clients[0].email, lead.email);
    assert_eq!(db.get_lead(&lead.id).await.unwrap().status, LeadStatus::Closed);
    assert_eq!(conversion.client.id, clients[0].id);

    // Converting again is refused and changes nothing.
    assert!(matches!(
        db.convert_lead_to_client(&lead.id).await,
        Err(DbError::Conflict(_))
    ));
    assert_eq!(count(&db, "clients").await, 1);
}

#[tokio::test]
async fn lead_conversion_rolls_back_on_failure() {
    let db = Database::new_in_memory().await.unwrap();
    let lead = db
        .create_lead(NewLead {
            name: "Rollback".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    // Make the last step of the conversion fail, after the lead is claimed
    // and the client row is inserted.
    sqlx::query(
        "CREATE TRIGGER block_lead_link BEFORE UPDATE OF converted_client_id ON leads
         BEGIN SELECT RAISE(ABORT, 'lead updates disabled'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    assert!(db.convert_lead_to_client(&lead.id).await.is_err());
    assert_eq!(count(&db, "clients").await, 0, "client insert must roll back");
    assert_eq!(db.get_lead(&lead.id).await.unwrap().status, LeadStatus::New);
}

/// A file-backed database: concurrent writers queue on the WAL write lock,
/// which the shared-cache in-memory database does not model.
async fn file_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Database::new(&dir.path().join("agencydesk.db"))
        .await
        .expect("file-backed database");
    (db, dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_conversions_create_one_client() {
    let (db, _dir) = file_db().await;
    let lead = db
        .create_lead(NewLead {
            name: "Race".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let id = lead.id.clone();
            tokio::spawn(async move { db.convert_lead_to_client(&id).await })
        })
        .collect();

    let mut converted = 0;
    let mut conflicts = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => converted += 1,
            Err(DbError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected conversion error: {other}"),
        }
    }
    assert_eq!((converted, conflicts), (1, 3));
    assert_eq!(count(&db, "clients").await, 1);
    let lead = db.get_lead(&lead.id).await.unwrap();
    assert_eq!(lead.status, LeadStatus::Closed);
    assert!(lead.converted_client_id.is_some());
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_task_cycles_each_advance_one_step() {
    let (db, _dir) = file_db().await;
    let client = seed_client(&db, "Acme").await;
    let project = seed_project(&db, &client, "Site").await;
    let task = db
        .create_task(NewTask {
            project_id: project,
            title: "Storyboard".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let cycles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let id = task.id.clone();
            tokio::spawn(async move { db.cycle_task_status(&id).await })
        })
        .collect();
    for cycle in cycles {
        cycle.await.unwrap().unwrap();
    }

    // todo → in-progress → done → todo → in-progress
    assert_eq!(db.get_task(&task.id).await.unwrap().status, TaskStatus::InProgress);
}

#[tokio::test]
async fn task_cycle_returns_to_todo() {
    let db = Database::new_in_memory().await.unwrap();
    let client = seed_client(&db, "Acme").await;
    let project = seed_project(&db, &client, "Site").await;
    let task = db
        .create_task(NewTask {
            project_id: project,
            title: "Wireframes".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut status = task.status;
    for _ in 0..3 {
        status = db.cycle_task_status(&task.id).await.unwrap().status;
    }
    assert_eq!(status, TaskStatus::Todo);
}

// ---------------------------------------------------------------------------
// Cascades
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_client_leaves_no_orphans() {
    let db = Database::new_in_memory().await.unwrap();
    let doomed = seed_client(&db, "Doomed").await;
    let kept = seed_client(&db, "Kept").await;

    for client in [&doomed, &kept] {
        let project = seed_project(&db, client, "Campaign").await;
        db.create_task(NewTask {
            project_id: project.clone(),
            title: "Task".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        db.create_invoice(NewInvoice {
            client_id: client.to_string(),
            project_id: Some(project.clone()),
            amount: 100.0,
            ..Default::default()
        })
        .await
        .unwrap();
        db.create_approval(NewApproval {
            client_id: client.to_string(),
            project_id: Some(project),
            title: "Asset".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        db.create_report(NewReport {
            client_id: client.to_string(),
            title: "Monthly".into(),
            period: None,
            file_url: "http://x/report.pdf".into(),
        })
        .await
        .unwrap();
    }

    db.delete_client(&doomed).await.unwrap();

    for table in ["projects", "tasks", "invoices", "approvals", "reports"] {
        assert_eq!(count(&db, table).await, 1, "{table} should keep only the other client's row");
    }
    let orphans: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tasks t LEFT JOIN projects p ON p.id = t.project_id WHERE p.id IS NULL",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(orphans.0, 0);
}

// ---------------------------------------------------------------------------
// Approvals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn project_approvals_are_filtered_and_newest_first() {
    let db = Database::new_in_memory().await.unwrap();
    let client = seed_client(&db, "Acme").await;
    let mine = seed_project(&db, &client, "Mine").await;
    let other = seed_project(&db, &client, "Other").await;

    let mut expected = Vec::new();
    for (i, project) in [&mine, &other, &mine, &other, &mine].into_iter().enumerate() {
        let approval = db
            .create_approval(NewApproval {
                client_id: client.clone(),
                project_id: Some(project.clone()),
                title: format!("Asset {i}"),
                ..Default::default()
            })
            .await
            .unwrap();
        if project == &mine {
            expected.push(approval.id);
        }
    }
    expected.reverse();

    let listed = db.list_approvals_for_project(&mine).await.unwrap();
    assert!(listed.iter().all(|a| a.project_id.as_deref() == Some(mine.as_str())));
    let ids: Vec<String> = listed.into_iter().map(|a| a.id).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn approval_status_accepts_any_transition() {
    let db = Database::new_in_memory().await.unwrap();
    let client = seed_client(&db, "Acme").await;
    let approval = db
        .create_approval(NewApproval {
            client_id: client,
            title: "Cut 1".into(),
            requires_sign_off: true,
            ..Default::default()
        })
        .await
        .unwrap();

    for status in [
        ApprovalStatus::Approved,
        ApprovalStatus::Uploaded,
        ApprovalStatus::Rejected,
        ApprovalStatus::Pending,
    ] {
        let updated = db
            .set_approval_status(
                &approval.id,
                ApprovalDecision {
                    status,
                    comment: None,
                    author_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn message_rules() {
    let db = Database::new_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for email in ["staff@agency.test", "client@acme.test"] {
        ids.push(
            db.create_profile(NewProfile {
                email: email.into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id,
        );
    }
    let conv = db
        .find_or_create_direct_conversation(&ids[0], &ids[1])
        .await
        .unwrap();

    let attachment_only = MessageDraft::default().with_attachment(Attachment {
        name: "cut.mp4".into(),
        url: "http://x/storage/chat-attachments/1-cut.mp4".into(),
        mime_type: "video/mp4".into(),
        size: 10_000,
    });
    assert!(db.send_message(&conv.id, &ids[0], attachment_only).await.is_ok());

    let err = db
        .send_message(&conv.id, &ids[0], MessageDraft::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Invalid(_)));
    assert_eq!(count(&db, "messages").await, 1);

    let inbox = db.list_conversations_for_profile(&ids[1]).await.unwrap();
    assert_eq!(inbox[0].unread_count, 1);
    db.mark_conversation_read(&conv.id, &ids[1]).await.unwrap();
    let inbox = db.list_conversations_for_profile(&ids[1]).await.unwrap();
    assert_eq!(inbox[0].unread_count, 0);
}

// ---------------------------------------------------------------------------
// Change bus and read degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn writes_publish_after_commit() {
    let db = Database::new_in_memory().await.unwrap();
    let mut clients = db.changes().subscribe_table(Table::Clients);

    let id = seed_client(&db, "Acme").await;
    match clients.recv().await {
        Some(Notification::Changed(event)) => {
            assert_eq!(event.op, ChangeOp::Insert);
            assert_eq!(event.id, id);
            // The row is visible by the time the event arrives.
            assert!(db.get_client(&event.id).await.is_ok());
        }
        other => panic!("expected a change, got {other:?}"),
    }

    // A failed write publishes nothing.
    assert!(db.delete_client("ghost").await.is_err());
    db.delete_client(&id).await.unwrap();
    match clients.recv().await {
        Some(Notification::Changed(event)) => assert_eq!(event.op, ChangeOp::Delete),
        other => panic!("expected a delete, got {other:?}"),
    }
}

#[tokio::test]
async fn list_reads_degrade_to_empty() {
    let db = Database::new_in_memory().await.unwrap();
    seed_client(&db, "Acme").await;
    db.pool().close().await;

    let result = db.list_clients().await;
    assert!(result.is_err());
    assert!(result.or_empty("clients").is_empty());
}
