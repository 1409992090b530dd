use bson::{doc, oid::ObjectId};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::fixtures::fakes::Outbound;
use crate::fixtures::test_app::TestApp;
use shiftdesk_db::models::Relation;

async fn request_absence(app: &TestApp, token: &str, body: Value) -> (u16, Value) {
    let resp = app
        .auth_post("/api/absences", token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn review(app: &TestApp, token: &str, id: &str, action: &str) -> (u16, Value) {
    let resp = app
        .auth_put(&format!("/api/absences/{id}/{action}"), token)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn requesting_an_absence_notifies_admins() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550400001").await;
    let max = app.seed_admin("Max", "+15550400002").await;
    let ben = app.seed_employee("Ben", "+15550400003").await;

    let (status, absence) = request_absence(
        &app,
        &ben.token,
        json!({
            "start_date": "2025-12-06",
            "reason": "fever",
            "absence_type": "sick",
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(absence["status"], "pending");
    assert_eq!(absence["absence_type"], "sick");
    assert_eq!(absence["start_date"], absence["end_date"]);
    assert!(absence["start_date"].as_str().unwrap().starts_with("2025-12-06"));

    for admin in [&ada, &max] {
        let sent = app.whatsapp.sent_to(&admin.wa_id);
        assert_eq!(sent.len(), 1, "{} was not told", admin.name);
    }
    assert!(app.whatsapp.sent_to(&ben.wa_id).is_empty());

    let admin_notes = app
        .state
        .stores
        .notifications
        .base
        .find_many(doc! { "relation": "absence" }, None)
        .await
        .unwrap();
    assert_eq!(admin_notes.len(), 2);
    assert!(admin_notes.iter().all(|n| n.relation == Relation::Absence));
    assert!(admin_notes.iter().all(|n| n.content.contains("fever")));
}

#[tokio::test]
async fn absence_dates_are_validated() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550400004").await;

    let (status, _) = request_absence(
        &app,
        &ben.token,
        json!({
            "start_date": "2025-12-08",
            "end_date": "2025-12-06",
            "reason": "trip",
        }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = request_absence(
        &app,
        &ben.token,
        json!({ "start_date": "2025-12-08", "reason": "" }),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn absence_lifecycle_moves_forward_only() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550400005").await;
    let ben = app.seed_employee("Ben", "+15550400006").await;

    let (_, absence) = request_absence(
        &app,
        &ben.token,
        json!({ "start_date": "2025-12-10", "end_date": "2025-12-12", "reason": "family visit", "absence_type": "personal" }),
    )
    .await;
    let id = absence["id"].as_str().unwrap().to_string();

    // Employees cannot review.
    let (status, body) = review(&app, &ben.token, &id, "approve").await;
    assert_eq!(status, 403);
    assert_eq!(body["msg"], "Admin access required");

    // Completing requires an approval first.
    let (status, _) = review(&app, &admin.token, &id, "complete").await;
    assert_eq!(status, 400);

    let (status, approved) = review(&app, &admin.token, &id, "approve").await;
    assert_eq!(status, 200);
    assert_eq!(approved["status"], "approved");
    assert_eq!(approved["reviewed_by"], admin.hex());
    assert!(approved["reviewed_at"].is_string());

    let told = app.whatsapp.sent_to(&ben.wa_id);
    assert_eq!(told.len(), 1);
    match &told[0] {
        Outbound::Template { message, .. } => {
            assert_eq!(message.name, "absence_update");
            assert_eq!(
                message.parameters,
                vec!["Ben", "approved", "2025-12-10", "2025-12-12"]
            );
        }
        other => panic!("expected a template, got {other:?}"),
    }

    let (status, _) = review(&app, &admin.token, &id, "reject").await;
    assert_eq!(status, 400);

    let (status, completed) = review(&app, &admin.token, &id, "complete").await;
    assert_eq!(status, 200);
    assert_eq!(completed["status"], "completed");
}

#[tokio::test]
async fn rejected_absence_can_never_be_approved() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550400007").await;
    let ben = app.seed_employee("Ben", "+15550400008").await;

    let (_, absence) = request_absence(
        &app,
        &ben.token,
        json!({ "start_date": "2025-12-20", "reason": "concert", "absence_type": "vacation" }),
    )
    .await;
    let id = absence["id"].as_str().unwrap().to_string();

    let (status, rejected) = review(&app, &admin.token, &id, "reject").await;
    assert_eq!(status, 200);
    assert_eq!(rejected["status"], "rejected");

    let (status, body) = review(&app, &admin.token, &id, "approve").await;
    assert_eq!(status, 400);
    assert_eq!(body["msg"], "Absence is rejected and cannot become approved");

    let stored = app
        .state
        .stores
        .absences
        .base
        .find_by_id(ObjectId::parse_str(&id).unwrap())
        .await
        .unwrap();
    assert_eq!(stored.status.as_str(), "rejected");
}

#[tokio::test]
async fn employees_only_see_their_own_absences() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550400009").await;
    let ben = app.seed_employee("Ben", "+15550400010").await;
    let cleo = app.seed_employee("Cleo", "+15550400011").await;

    for (user, reason) in [(&ben, "dentist"), (&cleo, "moving")] {
        let (status, _) = request_absence(
            &app,
            &user.token,
            json!({ "start_date": "2025-12-15", "reason": reason }),
        )
        .await;
        assert_eq!(status, 201);
    }

    let own: Vec<Value> = app
        .auth_get("/api/absences", &ben.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["reason"], "dentist");

    let all: Vec<Value> = app
        .auth_get("/api/absences", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn approving_covers_shift_by_asking_teammates() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550400012").await;
    let ben = app.seed_employee("Ben", "+15550400013").await;
    let cleo = app.seed_employee("Cleo", "+15550400014").await;
    let team = ObjectId::new();
    for user in [&ben, &cleo] {
        app.state
            .stores
            .users
            .update(user.id, doc! { "team_id": team })
            .await
            .unwrap();
    }
    let location = app.seed_location("Plant A").await;
    let schedule = app
        .seed_schedule(
            "Night line",
            location,
            vec![ben.id],
            admin.id,
            Utc::now() + Duration::days(4),
        )
        .await;
    app.state
        .stores
        .schedules
        .base
        .update_by_id(schedule, doc! { "$set": { "allow_auto_replacement": true } })
        .await
        .unwrap();

    let (_, absence) = request_absence(
        &app,
        &ben.token,
        json!({
            "start_date": "2025-12-18",
            "reason": "surgery",
            "absence_type": "sick",
            "schedule_id": schedule.to_hex(),
            "replacement_needed": true,
        }),
    )
    .await;
    let id = absence["id"].as_str().unwrap().to_string();
    assert!(app.whatsapp.sent_to(&cleo.wa_id).is_empty());

    let (status, _) = review(&app, &admin.token, &id, "approve").await;
    assert_eq!(status, 200);

    let asked = app.whatsapp.sent_to(&cleo.wa_id);
    assert_eq!(asked.len(), 1);
    match &asked[0] {
        Outbound::Template { message, .. } => {
            assert_eq!(message.name, "general_announcement_update");
            assert!(message.parameters[1].contains("Night line"));
        }
        other => panic!("expected a template, got {other:?}"),
    }

    // The schedule itself is unchanged.
    let stored = app.state.stores.schedules.base.find_by_id(schedule).await.unwrap();
    assert_eq!(stored.employees, vec![ben.id]);
}
