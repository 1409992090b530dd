use bson::doc;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use shiftdesk_db::models::{NotificationChannel, NotificationStatus, Relation};
use shiftdesk_services::dao::NewNotification;

use crate::fixtures::fakes::Outbound;
use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn traffic_alerts_fan_out_once_per_employee_and_shift() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600001").await;
    let ben = app.seed_employee("Ben", "+15550600002").await;
    let cleo = app.seed_employee("Cleo", "+15550600003").await;
    let location = app.seed_location("Plant A").await;
    let schedule = app
        .seed_schedule(
            "Early line",
            location,
            vec![ben.id, cleo.id],
            admin.id,
            Utc::now() + Duration::hours(20),
        )
        .await;
    app.maps.set_level(3);

    let report = app.state.traffic_alerts.run().await.unwrap();
    assert_eq!(report.schedules_alerted, 1);
    assert_eq!(report.notifications_sent, 2);

    for user in [&ben, &cleo] {
        let notes = app
            .state
            .stores
            .notifications
            .base
            .find_many(doc! { "recipient_id": user.id, "relation": "traffic" }, None)
            .await
            .unwrap();
        assert_eq!(notes.len(), 1, "{} should get one alert", user.name);
        assert_eq!(notes[0].relation, Relation::Traffic);
        assert_eq!(notes[0].related_id, Some(schedule));

        let sent = app.whatsapp.sent_to(&user.wa_id);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::Template { message, .. } => {
                assert_eq!(message.name, "traffic_alert");
                assert_eq!(message.parameters[3], "15");
                assert_eq!(message.parameters[4], "Plant A");
            }
            other => panic!("expected a template, got {other:?}"),
        }
    }
    assert!(app.whatsapp.sent_to(&admin.wa_id).is_empty());

    let again = app.state.traffic_alerts.run().await.unwrap();
    assert_eq!(again.notifications_sent, 0);
    let total = app
        .state
        .stores
        .notifications
        .base
        .count(doc! { "relation": "traffic" })
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn light_traffic_sends_no_alert() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600004").await;
    let ben = app.seed_employee("Ben", "+15550600005").await;
    let location = app.seed_location("Plant A").await;
    app.seed_schedule(
        "Early line",
        location,
        vec![ben.id],
        admin.id,
        Utc::now() + Duration::hours(20),
    )
    .await;
    app.maps.set_level(1);

    let report = app.state.traffic_alerts.run().await.unwrap();
    assert_eq!(report.schedules_checked, 1);
    assert_eq!(report.schedules_alerted, 0);
    assert!(app.whatsapp.sent().is_empty());
}

#[tokio::test]
async fn sent_notifications_carry_a_sent_timestamp() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600006").await;
    let ben = app.seed_employee("Ben", "+15550600007").await;
    let location = app.seed_location("Plant A").await;

    let start = Utc::now() + Duration::days(2);
    let resp = app
        .auth_post("/api/schedules", &admin.token)
        .json(&json!({
            "title": "Morning line",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::hours(8)).to_rfc3339(),
            "location_id": location.to_hex(),
            "employees": [ben.hex()],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let all = app
        .state
        .stores
        .notifications
        .base
        .find_many(doc! {}, None)
        .await
        .unwrap();
    assert!(!all.is_empty());
    for note in all {
        match note.status {
            NotificationStatus::Sent | NotificationStatus::Delivered | NotificationStatus::Read => {
                assert!(note.sent_at.is_some())
            }
            NotificationStatus::Failed => assert!(note.error.is_some()),
            NotificationStatus::Pending => panic!("notification left pending"),
        }
    }
}

#[tokio::test]
async fn recipients_list_and_read_their_notifications() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600008").await;
    let ben = app.seed_employee("Ben", "+15550600009").await;
    let cleo = app.seed_employee("Cleo", "+15550600010").await;
    let location = app.seed_location("Plant A").await;

    let start = Utc::now() + Duration::days(2);
    app.auth_post("/api/schedules", &admin.token)
        .json(&json!({
            "title": "Morning line",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::hours(8)).to_rfc3339(),
            "location_id": location.to_hex(),
            "employees": [ben.hex()],
        }))
        .send()
        .await
        .unwrap();

    let page: Value = app
        .auth_get("/api/notifications?page=1&per_page=10", &ben.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    let note = &page["items"][0];
    assert_eq!(note["status"], "sent");
    assert_eq!(note["relation"], "schedule");
    let id = note["id"].as_str().unwrap().to_string();
    let path = format!("/api/notifications/{id}/read");

    let resp = app.auth_put(&path, &cleo.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_put(&path, &ben.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let read: Value = resp.json().await.unwrap();
    assert_eq!(read["status"], "read");
    assert!(read["read_at"].is_string());

    // Reading twice is harmless.
    let resp = app.auth_put(&path, &ben.token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let empty: Value = app
        .auth_get("/api/notifications", &cleo.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["total"], 0);
}

#[tokio::test]
async fn pending_notification_cannot_be_read() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550600011").await;
    let id = app
        .state
        .stores
        .notifications
        .create_pending(NewNotification {
            channel: NotificationChannel::Email,
            recipient_id: ben.id,
            subject: "Queued".to_string(),
            content: "Not yet delivered".to_string(),
            relation: Relation::Other,
            related_id: None,
            created_by: None,
        })
        .await
        .unwrap();

    let resp = app
        .auth_put(&format!("/api/notifications/{}/read", id.to_hex()), &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["msg"], "A pending notification cannot be marked as read");
}

#[tokio::test]
async fn dashboard_scopes_counts_by_role() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600012").await;
    let ben = app.seed_employee("Ben", "+15550600013").await;
    let cleo = app.seed_employee("Cleo", "+15550600014").await;
    let location = app.seed_location("Plant A").await;
    app.seed_schedule("Ben later", location, vec![ben.id], admin.id, Utc::now() + Duration::days(3))
        .await;
    app.seed_schedule("Cleo later", location, vec![cleo.id], admin.id, Utc::now() + Duration::days(3))
        .await;
    app.auth_post("/api/hour-tracking/clock-in", &ben.token)
        .send()
        .await
        .unwrap();

    let global: Value = app
        .auth_get("/api/dashboard/stats", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(global["scope"], "global");
    assert_eq!(global["upcoming_schedules"], 2);
    assert_eq!(global["active_clock_ins"], 1);
    assert_eq!(global["users"], 3);
    assert_eq!(global["locations"], 1);
    assert_eq!(global["active_conversations"], 0);

    let own: Value = app
        .auth_get("/api/dashboard/stats", &cleo.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["scope"], "own");
    assert_eq!(own["upcoming_schedules"], 1);
    assert_eq!(own["active_clock_ins"], 0);
    assert!(own["users"].is_null());
}

#[tokio::test]
async fn daily_briefing_lists_todays_shifts_with_traffic() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550600015").await;
    let ben = app.seed_employee("Ben", "+15550600016").await;
    let location = app.seed_location("Plant A").await;
    app.seed_schedule("Today line", location, vec![ben.id], admin.id, Utc::now())
        .await;
    app.maps.set_level(2);

    let resp = app
        .auth_get("/api/daily-briefing", &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let briefing: Value = resp.json().await.unwrap();
    assert_eq!(briefing["name"], "Ben");
    assert_eq!(briefing["shifts"].as_array().unwrap().len(), 1);
    assert_eq!(briefing["shifts"][0]["title"], "Today line");
    assert_eq!(briefing["shifts"][0]["location"], "Plant A");
    assert_eq!(briefing["shifts"][0]["traffic"]["level"], 2);
    assert!(briefing["pending_absences"].is_null());
    assert!(briefing["text"].as_str().unwrap().contains("Today line at Plant A"));

    let admin_view: Value = app
        .auth_get("/api/daily-briefing", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(admin_view["shifts"].as_array().unwrap().is_empty());
    assert_eq!(admin_view["pending_absences"], 0);
}
