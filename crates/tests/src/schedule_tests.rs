use bson::{DateTime, doc};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use crate::fixtures::fakes::Outbound;
use crate::fixtures::seed::UserSpec;
use crate::fixtures::test_app::TestApp;
use shiftdesk_db::models::Role;

fn shift_body(location: &str, employees: &[String]) -> Value {
    let start = Utc::now() + Duration::days(3);
    json!({
        "title": "Morning line",
        "start_time": start.to_rfc3339(),
        "end_time": (start + Duration::hours(8)).to_rfc3339(),
        "location_id": location,
        "employees": employees,
    })
}

#[tokio::test]
async fn creating_a_schedule_notifies_assigned_employees() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300001").await;
    let ben = app.seed_employee("Ben", "+15550300002").await;
    let location = app.seed_location("Plant A").await;

    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&shift_body(&location.to_hex(), &[ben.hex()]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let schedule: Value = resp.json().await.unwrap();
    assert_eq!(schedule["status"], "scheduled");
    assert_eq!(schedule["employees"][0], ben.hex());

    // No open conversation, so the approved template is used.
    let sent = app.whatsapp.sent_to(&ben.wa_id);
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Outbound::Template { message, .. } => {
            assert_eq!(message.name, "schedule_reminder");
            assert_eq!(message.language, "en_US");
            assert_eq!(message.parameters[0], "Ben");
            assert_eq!(message.parameters[1], "Morning line");
            assert_eq!(message.parameters[4], "Plant A");
        }
        other => panic!("expected a template, got {other:?}"),
    }
    let mails = app.mailer.sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, ben.email);

    let stored = app
        .state
        .stores
        .notifications
        .base
        .find_many(doc! { "recipient_id": ben.id }, None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status.as_str(), "sent");
    assert!(stored[0].sent_at.is_some());
}

#[tokio::test]
async fn schedule_reminder_uses_preferred_language_after_window_closes() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300003").await;
    let lea = app
        .seed_user(UserSpec {
            name: "Lea",
            role: Role::Employee,
            phone: Some("+33600000001"),
            language: "fr",
        })
        .await;
    let location = app.seed_location("Usine B").await;

    let stale = DateTime::from_millis(DateTime::now().timestamp_millis() - 30 * 3600 * 1000);
    app.db
        .collection::<bson::Document>("conversations")
        .insert_one(doc! {
            "user_id": lea.id,
            "platform": "whatsapp",
            "messages": [],
            "context": {},
            "active": true,
            "last_activity": stale,
            "created_at": stale,
            "updated_at": stale,
        })
        .await
        .unwrap();

    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&shift_body(&location.to_hex(), &[lea.hex()]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let sent = app.whatsapp.sent_to(&lea.wa_id);
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Outbound::Template { message, .. } => {
            assert_eq!(message.name, "schedule_reminder_fr");
            assert_eq!(message.language, "fr");
        }
        other => panic!("expected a template, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_template_falls_back_to_legacy_text() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300004").await;
    let ben = app.seed_employee("Ben", "+15550300005").await;
    let location = app.seed_location("Plant A").await;

    let resp = app
        .auth_put("/api/whatsapp/settings", &admin.token)
        .json(&json!({ "templates": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&shift_body(&location.to_hex(), &[ben.hex()]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let sent = app.whatsapp.sent_to(&ben.wa_id);
    assert_eq!(sent.len(), 1);
    let text = sent[0].text().expect("legacy fallback is free-form text");
    assert!(text.contains("Morning line"), "unexpected fallback: {text}");
    assert!(text.contains("Plant A"), "unexpected fallback: {text}");
}

#[tokio::test]
async fn employees_cannot_read_other_peoples_schedules() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300006").await;
    let ben = app.seed_employee("Ben", "+15550300007").await;
    let cleo = app.seed_employee("Cleo", "+15550300008").await;
    let location = app.seed_location("Plant A").await;
    let schedule = app
        .seed_schedule(
            "Ben only",
            location,
            vec![ben.id],
            admin.id,
            Utc::now() + Duration::days(1),
        )
        .await;
    let path = format!("/api/schedules/{}", schedule.to_hex());

    let resp = app.auth_get(&path, &cleo.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("title").is_none());
    assert!(body["msg"].is_string());

    let resp = app.auth_get(&path, &ben.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let own: Vec<Value> = app
        .auth_get("/api/schedules", &cleo.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(own.is_empty());

    let all: Vec<Value> = app
        .auth_get("/api/schedules", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn schedule_times_are_validated() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300009").await;
    let location = app.seed_location("Plant A").await;
    let start = Utc::now() + Duration::days(1);

    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&json!({
            "title": "Backwards",
            "start_time": start.to_rfc3339(),
            "end_time": (start - Duration::hours(1)).to_rfc3339(),
            "location_id": location.to_hex(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&json!({
            "title": "Bad id",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::hours(1)).to_rfc3339(),
            "location_id": "not-an-id",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn updating_a_schedule_sends_change_notice() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550300010").await;
    let ben = app.seed_employee("Ben", "+15550300011").await;
    let location = app.seed_location("Plant A").await;
    let schedule = app
        .seed_schedule(
            "Evening line",
            location,
            vec![ben.id],
            admin.id,
            Utc::now() + Duration::days(2),
        )
        .await;

    let resp = app
        .auth_put(&format!("/api/schedules/{}", schedule.to_hex()), &admin.token)
        .json(&json!({ "title": "Late line" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["title"], "Late line");

    let sent = app.whatsapp.sent_to(&ben.wa_id);
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Outbound::Template { message, .. } => assert_eq!(message.name, "schedule_change"),
        other => panic!("expected a template, got {other:?}"),
    }

    let resp = app
        .auth_delete(&format!("/api/schedules/{}", schedule.to_hex()), &admin.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
}
