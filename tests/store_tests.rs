mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use portal::db::{ProjectScope, Store};
use portal::error::PortalError;
use portal::models::{NewProject, Project, ProjectChanges, ProjectStatus, Role};
use portal::workflow::ClientWorkspace;

async fn create_project(store: &dyn Store, client_id: Uuid, name: &str) -> Project {
    store
        .insert_project(&NewProject {
            client_id,
            name: name.to_string(),
            description: None,
            status: ProjectStatus::Planning,
            completion_percentage: 0,
            notes: None,
        })
        .await
        .expect("insert project failed")
}

async fn add_update(db: &common::TestDb, project_id: Uuid, title: &str, minutes_ago: i64) {
    sqlx::query("INSERT INTO project_updates (project_id, title, created_at) VALUES ($1, $2, $3)")
        .bind(project_id)
        .bind(title)
        .bind(Utc::now() - Duration::minutes(minutes_ago))
        .execute(&db.pool)
        .await
        .expect("insert update failed");
}

#[tokio::test]
async fn test_list_clients_excludes_admins() {
    let db = common::spawn_db().await;
    let store = db.store();
    let ana = db.profile("ana@example.com", Role::Client).await;
    db.profile("root@example.com", Role::Admin).await;
    let ben = db.profile("ben@example.com", Role::Client).await;

    let clients = store.list_clients().await.unwrap();
    let ids: Vec<_> = clients.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![ben.id, ana.id]);

    assert_eq!(store.find_profile(ana.id).await.unwrap(), Some(ana));
    assert_eq!(store.find_profile(Uuid::now_v7()).await.unwrap(), None);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn test_project_listing_is_scoped_to_client() {
    let db = common::spawn_db().await;
    let store = db.store();
    let ana = db.profile("ana@example.com", Role::Client).await;
    let ben = db.profile("ben@example.com", Role::Client).await;
    let website = create_project(&store, ana.id, "Website").await;
    let logo = create_project(&store, ana.id, "Logo").await;
    let app = create_project(&store, ben.id, "App").await;

    let own = store.list_projects(ProjectScope::Client(ana.id)).await.unwrap();
    let ids: Vec<_> = own.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![logo.id, website.id]);

    let all = store.list_projects(ProjectScope::All).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, app.id);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn test_update_and_delete_project() {
    let db = common::spawn_db().await;
    let store = db.store();
    let ana = db.profile("ana@example.com", Role::Client).await;
    let project = create_project(&store, ana.id, "Website").await;

    let updated = store
        .update_project(
            project.id,
            &ProjectChanges {
                name: "Website v2".into(),
                description: Some("Redesign".into()),
                status: ProjectStatus::WaitingFeedback,
                completion_percentage: 80,
                notes: None,
                drive_link: Some("https://drive.example.com/x".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Website v2");
    assert_eq!(updated.status, ProjectStatus::WaitingFeedback);
    assert_eq!(updated.completion_percentage, 80);
    assert_eq!(updated.client_id, ana.id);

    let missing = store
        .update_project(Uuid::now_v7(), &ProjectChanges::from_edit(&updated))
        .await
        .unwrap_err();
    assert!(matches!(missing, PortalError::NotFound(_)));

    store.delete_project(project.id).await.unwrap();
    let err = store.delete_project(project.id).await.unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn test_client_can_only_edit_own_drive_link() {
    let db = common::spawn_db().await;
    let store = Arc::new(db.store());
    let ana = db.profile("ana@example.com", Role::Client).await;
    let ben = db.profile("ben@example.com", Role::Client).await;
    let project = create_project(store.as_ref(), ana.id, "Website").await;

    let ben_view = ClientWorkspace::new(store.clone(), ben);
    let err = ben_view
        .update_drive_link(project.id, "https://evil.example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));

    let ana_view = ClientWorkspace::new(store.clone(), ana);
    let linked = ana_view
        .update_drive_link(project.id, "  https://drive.example.com/files  ")
        .await
        .unwrap();
    assert_eq!(linked.drive_link.as_deref(), Some("https://drive.example.com/files"));
    assert_eq!(linked.name, "Website");

    let cleared = ana_view.update_drive_link(project.id, "   ").await.unwrap();
    assert_eq!(cleared.drive_link, None);

    common::cleanup_db(db).await;
}

#[tokio::test]
async fn test_recent_updates_are_scoped_and_capped() {
    let db = common::spawn_db().await;
    let store = Arc::new(db.store());
    let ana = db.profile("ana@example.com", Role::Client).await;
    let ben = db.profile("ben@example.com", Role::Client).await;
    let website = create_project(store.as_ref(), ana.id, "Website").await;
    let app = create_project(store.as_ref(), ben.id, "App").await;

    for i in 0..7 {
        add_update(&db, website.id, &format!("Milestone {i}"), 10 + i).await;
    }
    add_update(&db, app.id, "Other client", 0).await;

    let view = ClientWorkspace::new(store.clone(), ana);
    let updates = view.recent_updates().await.unwrap();

    assert_eq!(updates.len(), 5);
    assert!(updates.iter().all(|u| u.project_id == website.id));
    assert_eq!(updates[0].title, "Milestone 0");
    assert_eq!(updates[4].title, "Milestone 4");

    let all = store.recent_updates(ProjectScope::All, 5).await.unwrap();
    assert_eq!(all[0].title, "Other client");

    common::cleanup_db(db).await;
}
