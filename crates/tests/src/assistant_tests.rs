use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use bson::{doc, oid::ObjectId};
use chrono::Utc;
use serde_json::json;
use shiftdesk_db::models::{AbsenceType, Conversation, Relation};
use shiftdesk_services::providers::ChatRole;

use crate::fixtures::fakes::Outbound;
use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn admin_broadcast_reaches_everyone_with_a_phone() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550800001").await;
    let ben = app.seed_employee("Ben", "+15550800002").await;
    let cleo = app.seed_employee("Cleo", "+15550800003").await;

    let resp = app
        .send_inbound_text(&ada.wa_id, "broadcast plant closed friday")
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let confirmation = "Broadcast message sent to 3 users.";
    assert!(
        app.eventually(|| {
            app.whatsapp
                .sent_to(&ada.wa_id)
                .iter()
                .any(|o| o.text() == Some(confirmation))
        })
        .await,
        "no broadcast confirmation"
    );

    for employee in [&ben, &cleo] {
        let sent = app.whatsapp.sent_to(&employee.wa_id);
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Outbound::Template { message, .. } => {
                assert_eq!(message.name, "general_announcement_update");
                assert_eq!(message.parameters[1], "plant closed friday");
            }
            other => panic!("expected a template, got {other:?}"),
        }
    }
    // The admin is inside the session window and gets the text itself.
    assert!(
        app.whatsapp
            .sent_to(&ada.wa_id)
            .iter()
            .any(|o| o.text() == Some("plant closed friday"))
    );

    let announcements = app
        .state
        .stores
        .notifications
        .base
        .count(doc! { "relation": "announcement" })
        .await
        .unwrap();
    assert_eq!(announcements, 3);
    assert!(app.llm.requests().is_empty());
}

#[tokio::test]
async fn employees_cannot_run_admin_commands() {
    let app = TestApp::spawn().await;
    app.seed_admin("Ada", "+15550800004").await;
    let ben = app.seed_employee("Ben", "+15550800005").await;

    let replies = app.converse(&ben.wa_id, "broadcast plant closed friday").await;
    assert_eq!(
        replies,
        vec!["Sorry, admin commands are only available to administrators.".to_string()]
    );
    assert_eq!(app.whatsapp.sent().len(), 1);
}

#[tokio::test]
async fn schedule_query_without_shifts_has_exact_reply() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550800006").await;

    let replies = app.converse(&ben.wa_id, "What's my schedule today?").await;
    assert_eq!(
        replies,
        vec!["You don't have any schedules for today, Ben.".to_string()]
    );

    let notifications = app
        .state
        .stores
        .notifications
        .base
        .count(doc! {})
        .await
        .unwrap();
    assert_eq!(notifications, 0);
    assert!(app.llm.requests().is_empty());

    let conversation = app
        .db
        .collection::<Conversation>(Conversation::COLLECTION)
        .find_one(doc! { "user_id": ben.id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.context["lastIntent"], json!("schedule_query"));
}

#[tokio::test]
async fn schedule_query_lists_todays_shift() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550800007").await;
    let ben = app.seed_employee("Ben", "+15550800008").await;
    let location = app.seed_location("Plant A").await;
    app.seed_schedule("Morning line", location, vec![ben.id], admin.id, Utc::now())
        .await;

    let replies = app.converse(&ben.wa_id, "what's my schedule today").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Here are your schedules for today, Ben:"));
    assert!(replies[0].contains("Morning line at Plant A"));
}

#[tokio::test]
async fn traffic_query_reports_conditions_near_the_shift() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550800009").await;
    let ben = app.seed_employee("Ben", "+15550800010").await;
    let location = app.seed_location("Plant A").await;
    app.seed_schedule("Morning line", location, vec![ben.id], admin.id, Utc::now())
        .await;
    app.maps.set_level(3);

    let replies = app.converse(&ben.wa_id, "how is the traffic to work").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Traffic near Plant A for your Morning line shift"));
    assert!(replies[0].contains("Expect about 15 extra minutes."));
    assert!(replies[0].contains("Traffic is heavy."));
}

#[tokio::test]
async fn voice_absence_request_is_recorded_and_admins_told() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550800011").await;
    let ben = app.seed_employee("Ben", "+15550800012").await;
    app.llm.label("sick", "absence_request");
    app.asr.will_hear("I'm sick tomorrow 12/06/2025 because fever");
    app.whatsapp.put_media("voice-1", vec![7u8; 2048]);

    let resp = app.send_inbound_audio(&ben.wa_id, "voice-1").await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(app.eventually(|| !app.whatsapp.sent_to(&ben.wa_id).is_empty()).await);

    let reply = app.whatsapp.sent_to(&ben.wa_id)[0].text().unwrap().to_string();
    assert_eq!(
        reply,
        "Thanks Ben, your sick absence request for 2025-12-06 has been submitted and is pending approval."
    );
    assert_eq!(app.asr.calls(), 1);

    let absences = app.state.stores.absences.list(Some(ben.id)).await.unwrap();
    assert_eq!(absences.len(), 1);
    let absence = &absences[0];
    assert_eq!(absence.reason, "fever");
    assert_eq!(absence.absence_type, AbsenceType::Sick);
    assert_eq!(absence.status.as_str(), "pending");
    assert_eq!(absence.start_date, absence.end_date);
    assert_eq!(
        absence.start_date.try_to_rfc3339_string().unwrap(),
        "2025-12-06T00:00:00Z"
    );

    let admin_notes = app
        .state
        .stores
        .notifications
        .base
        .find_many(doc! { "recipient_id": ada.id }, None)
        .await
        .unwrap();
    assert_eq!(admin_notes.len(), 1);
    assert_eq!(admin_notes[0].relation, Relation::Absence);
    assert_eq!(app.whatsapp.sent_to(&ada.wa_id).len(), 1);

    let conversation = app
        .db
        .collection::<Conversation>(Conversation::COLLECTION)
        .find_one(doc! { "user_id": ben.id })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.messages[0].audio_ref.as_deref(), Some("voice-1"));
    assert_eq!(
        conversation.messages[0].text,
        "I'm sick tomorrow 12/06/2025 because fever"
    );
}

#[tokio::test]
async fn silent_voice_note_gets_a_retry_prompt() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550800013").await;
    app.whatsapp.put_media("voice-2", vec![1u8; 4096]);

    app.send_inbound_audio(&ben.wa_id, "voice-2").await;
    assert!(app.eventually(|| !app.whatsapp.sent_to(&ben.wa_id).is_empty()).await);

    assert_eq!(
        app.whatsapp.sent_to(&ben.wa_id)[0].text(),
        Some("I couldn't hear anything in your voice message. Could you try again or type your question?")
    );
    assert_eq!(app.asr.calls(), 1);
}

#[tokio::test]
async fn general_questions_go_to_the_language_model() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550800014").await;
    app.llm.answer_with("Safety boots and a high-visibility vest.");

    let replies = app.converse(&ben.wa_id, "What is the dress code?").await;
    assert_eq!(
        replies,
        vec!["Safety boots and a high-visibility vest.".to_string()]
    );

    let requests = app.llm.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages[0].role, ChatRole::System);
    assert!(messages[0].content.contains("Ben"));
    let last = messages.last().unwrap();
    assert_eq!(last.role, ChatRole::User);
    assert_eq!(last.content, "What is the dress code?");
}

#[tokio::test]
async fn replies_are_capped_at_the_configured_length() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550800015").await;
    let ben = app.seed_employee("Ben", "+15550800016").await;
    app.auth_put("/api/whatsapp/settings", &admin.token)
        .json(&json!({ "max_response_length": 12 }))
        .send()
        .await
        .unwrap();
    app.llm.answer_with("This answer is much longer than twelve characters.");

    let replies = app.converse(&ben.wa_id, "hello").await;
    assert_eq!(replies, vec!["This answer ".to_string()]);
}

#[tokio::test]
async fn assistant_settings_gate_replies() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550800017").await;
    let ben = app.seed_employee("Ben", "+15550800018").await;

    // Without AI processing the welcome message is sent.
    app.auth_put("/api/whatsapp/settings", &admin.token)
        .json(&json!({ "ai_processing": false, "welcome_message": "Hello from the plant" }))
        .send()
        .await
        .unwrap();
    let replies = app.converse(&ben.wa_id, "what's my schedule today").await;
    assert_eq!(replies, vec!["Hello from the plant".to_string()]);

    // Without auto-reply the message is only stored.
    app.auth_put("/api/whatsapp/settings", &admin.token)
        .json(&json!({ "auto_reply": false }))
        .send()
        .await
        .unwrap();
    app.send_inbound_text(&ben.wa_id, "anyone there?").await;
    let mut stored = 0;
    for _ in 0..40 {
        stored = app
            .db
            .collection::<Conversation>(Conversation::COLLECTION)
            .find_one(doc! { "user_id": ben.id })
            .await
            .unwrap()
            .map(|c| c.messages.len())
            .unwrap_or_default();
        if stored >= 3 {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(50)).await;
    }
    assert_eq!(stored, 3);
    assert_eq!(app.whatsapp.sent_to(&ben.wa_id).len(), 1);

    // Disabled: nothing happens at all.
    app.auth_put("/api/whatsapp/settings", &admin.token)
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    app.send_inbound_text(&ben.wa_id, "hello?").await;
    tokio::time::sleep(StdDuration::from_millis(300)).await;
    assert_eq!(app.whatsapp.sent_to(&ben.wa_id).len(), 1);
}

async fn active_conversation(app: &TestApp, user: ObjectId) -> Conversation {
    app.db
        .collection::<Conversation>(Conversation::COLLECTION)
        .find_one(doc! { "user_id": user, "active": true })
        .await
        .unwrap()
        .expect("no active conversation")
}

#[tokio::test]
async fn route_query_plans_to_the_remembered_location() {
    let app = TestApp::spawn().await;
    let admin = app.seed_admin("Ada", "+15550800019").await;
    let ben = app.seed_employee("Ben", "+15550800020").await;
    let home = app.seed_location("Home").await;
    let plant = app.seed_location("Plant A").await;
    let depot = app.seed_location("Depot").await;
    app.seed_schedule("Morning line", plant, vec![ben.id], admin.id, Utc::now())
        .await;

    // No origin yet: the destination is still remembered.
    let replies = app.converse(&ben.wa_id, "what's the best route to work").await;
    assert_eq!(
        replies,
        vec!["Set a default starting location in your profile and I'll plan routes to Plant A.".to_string()]
    );
    let conversation = active_conversation(&app, ben.id).await;
    assert_eq!(conversation.context_str("currentLocation"), Some(plant.to_hex().as_str()));
    assert!(!conversation.context.contains_key("routeData"));

    app.state
        .stores
        .users
        .update(ben.id, doc! { "default_location_id": home })
        .await
        .unwrap();
    let replies = app.converse(&ben.wa_id, "what's the best route to work").await;
    assert_eq!(
        replies,
        vec!["Routes to Plant A:\n1. 10.0 km, 20 min (+2 min traffic)\n2. 11.0 km, 25 min (+2 min traffic)".to_string()]
    );
    let conversation = active_conversation(&app, ben.id).await;
    let routes = conversation.context["routeData"].as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["distance_km"], json!(10.0));
    assert_eq!(routes[1]["travel_minutes"], json!(25.0));

    // A location picked up earlier in the conversation wins over today's shift.
    let slots = BTreeMap::from([("currentLocation".to_string(), json!(depot.to_hex()))]);
    app.state
        .stores
        .conversations
        .update_context(conversation.id.unwrap(), &slots)
        .await
        .unwrap();
    let replies = app.converse(&ben.wa_id, "show me alternative routes").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Routes to Depot:\n1. 10.0 km"));
    let conversation = active_conversation(&app, ben.id).await;
    assert_eq!(conversation.context_str("currentLocation"), Some(depot.to_hex().as_str()));
    assert_eq!(conversation.context["lastIntent"], json!("route_query"));
}

#[tokio::test]
async fn admin_lookups_report_users_schedules_and_status() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550800021").await;
    let ben = app.seed_employee("Ben", "+15550800022").await;
    let plant = app.seed_location("Plant A").await;
    app.seed_schedule("Morning line", plant, vec![ben.id], ada.id, Utc::now())
        .await;
    app.llm.label("schedules", "admin_command");
    app.llm.label("stats", "admin_command");

    let replies = app.converse(&ada.wa_id, "list all users").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Users (2):"));
    assert!(replies[0].contains(&format!("- Ben [{}] role: employee", ben.hex())));

    let replies = app.converse(&ada.wa_id, "schedules today").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Schedules on "));
    assert!(replies[0].contains("Morning line at Plant A (1 assigned)"));

    let replies = app.converse(&ada.wa_id, "stats please").await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with(
        "System status:\n- Users: 2\n- Schedules: 1\n- Locations: 1\n- Active conversations: 1"
    ));
    assert!(app.whatsapp.sent_to(&ben.wa_id).is_empty());
}

#[tokio::test]
async fn admin_notify_messages_one_user() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550800023").await;
    let ben = app.seed_employee("Ben", "+15550800024").await;
    let cleo = app.seed_employee("Cleo", "+15550800025").await;
    app.llm.label("notify", "admin_command");

    let replies = app.converse(&ada.wa_id, "notify Ben about bring your badge").await;
    assert_eq!(replies, vec!["Message sent to Ben.".to_string()]);

    let sent = app.whatsapp.sent_to(&ben.wa_id);
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Outbound::Template { message, .. } => {
            assert_eq!(message.name, "general_announcement_update");
            assert_eq!(message.parameters[1], "bring your badge");
        }
        other => panic!("expected a template, got {other:?}"),
    }
    assert!(app.whatsapp.sent_to(&cleo.wa_id).is_empty());

    let notes = app
        .state
        .stores
        .notifications
        .base
        .find_many(doc! { "recipient_id": ben.id }, None)
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "bring your badge");

    let replies = app.converse(&ada.wa_id, "notify Zed about nothing").await;
    assert_eq!(replies, vec!["User \"Zed\" not found.".to_string()]);
}

#[tokio::test]
async fn admin_decisions_resolve_the_target_absence() {
    let app = TestApp::spawn().await;
    let ada = app.seed_admin("Ada", "+15550800026").await;
    let ben = app.seed_employee("Ben", "+15550800027").await;
    let cleo = app.seed_employee("Cleo", "+15550800028").await;
    app.llm.label("approve", "admin_command");
    app.llm.label("reject", "admin_command");

    let mut ids = Vec::new();
    for (user, reason) in [(&ben, "dentist"), (&cleo, "moving house")] {
        let resp = app
            .auth_post("/api/absences", &user.token)
            .json(&json!({
                "start_date": "2025-12-10",
                "reason": reason,
                "absence_type": "personal",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        let body: serde_json::Value = resp.json().await.unwrap();
        ids.push(body["id"].as_str().unwrap().to_string());
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    let (ben_absence, cleo_absence) = (&ids[0], &ids[1]);

    // No id and no name: the newest pending request.
    let replies = app.converse(&ada.wa_id, "approve the absence").await;
    assert_eq!(
        replies,
        vec![format!("Absence {cleo_absence} is now approved. The employee has been notified.")]
    );

    // By requester name.
    let replies = app.converse(&ada.wa_id, "reject absence for Ben").await;
    assert_eq!(
        replies,
        vec![format!("Absence {ben_absence} is now rejected. The employee has been notified.")]
    );

    // By id, which also surfaces the transition guard.
    let replies = app
        .converse(&ada.wa_id, &format!("approve {ben_absence}"))
        .await;
    assert_eq!(
        replies,
        vec!["Absence is rejected and cannot become approved".to_string()]
    );

    let replies = app.converse(&ada.wa_id, "approve the absence").await;
    assert_eq!(
        replies,
        vec!["No matching pending absence request found.".to_string()]
    );

    let statuses: Vec<(ObjectId, String)> = app
        .state
        .stores
        .absences
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .map(|a| (a.user_id, a.status.as_str().to_string()))
        .collect();
    assert!(statuses.contains(&(ben.id, "rejected".to_string())));
    assert!(statuses.contains(&(cleo.id, "approved".to_string())));
}
