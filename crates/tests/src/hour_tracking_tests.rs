use chrono::Utc;
use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn clock_in_and_out_records_hours() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550500001").await;
    let location = app.seed_location("Plant A").await;
    app.maps.set_level(2);

    let resp = app
        .auth_post("/api/hour-tracking/clock-in", &ben.token)
        .json(&json!({ "location_id": location.to_hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["status"], "active");
    assert_eq!(record["day"], Utc::now().format("%Y-%m-%d").to_string());
    assert_eq!(record["traffic"]["level"], 2);
    assert!(record["clock_out"].is_null());

    let id = record["id"].as_str().unwrap();
    let resp = app
        .auth_post(&format!("/api/hour-tracking/clock-out/{id}"), &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["status"], "completed");
    assert!(record["clock_out"].is_string());
    assert!(record["total_hours"].as_f64().unwrap() >= 0.0);

    // A finished record cannot be closed twice.
    let resp = app
        .auth_post(&format!("/api/hour-tracking/clock-out/{id}"), &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn second_clock_in_on_the_same_day_is_rejected() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550500002").await;

    let resp = app
        .auth_post("/api/hour-tracking/clock-in", &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let record: Value = resp.json().await.unwrap();
    assert!(record["traffic"].is_null());

    let resp = app
        .auth_post("/api/hour-tracking/clock-in", &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["msg"], "You are already clocked in today");
}

#[tokio::test]
async fn clock_in_against_a_schedule_requires_assignment() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550500003").await;
    let ben = app.seed_employee("Ben", "+15550500004").await;
    let cleo = app.seed_employee("Cleo", "+15550500005").await;
    let location = app.seed_location("Plant A").await;
    let schedule = app
        .seed_schedule("Morning line", location, vec![ben.id], admin.id, Utc::now())
        .await;

    let resp = app
        .auth_post("/api/hour-tracking/clock-in", &cleo.token)
        .json(&json!({ "schedule_id": schedule.to_hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/hour-tracking/clock-in", &ben.token)
        .json(&json!({ "schedule_id": schedule.to_hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["schedule_id"], schedule.to_hex());
    assert_eq!(record["location_id"], location.to_hex());
    assert_eq!(record["traffic"]["level"], 0);
}

#[tokio::test]
async fn records_are_private_to_their_owner() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550500006").await;
    let ben = app.seed_employee("Ben", "+15550500007").await;
    let cleo = app.seed_employee("Cleo", "+15550500008").await;

    let mut ids = Vec::new();
    for user in [&ben, &cleo] {
        let record: Value = app
            .auth_post("/api/hour-tracking/clock-in", &user.token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(record["id"].as_str().unwrap().to_string());
    }

    // Closing someone else's record looks like a missing record.
    let resp = app
        .auth_post(&format!("/api/hour-tracking/clock-out/{}", ids[1]), &ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let own: Vec<Value> = app
        .auth_get("/api/hour-tracking", &ben.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["user_id"], ben.hex());

    let all: Vec<Value> = app
        .auth_get("/api/hour-tracking", &admin.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}
