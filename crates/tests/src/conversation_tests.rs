use bson::{DateTime, doc};
use serde_json::json;
use shiftdesk_db::models::{Conversation, ConversationMessage, Platform};

use crate::fixtures::test_app::TestApp;

const HOUR_MS: i64 = 60 * 60 * 1000;

fn hours_ago(hours: i64) -> DateTime {
    DateTime::from_millis(DateTime::now().timestamp_millis() - hours * HOUR_MS)
}

#[tokio::test]
async fn conversation_silent_for_a_day_is_replaced() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550900001").await;
    let conversations = &app.state.stores.conversations;

    let stale = Conversation {
        id: None,
        user_id: ben.id,
        platform: Platform::Whatsapp,
        messages: vec![ConversationMessage::user("see you tomorrow", None)],
        context: [("lastIntent".to_string(), json!("schedule_query"))].into(),
        active: true,
        last_activity: hours_ago(25),
        created_at: hours_ago(30),
        updated_at: hours_ago(25),
    };
    let stale_id = conversations.base.insert_one(&stale).await.unwrap();

    assert!(conversations.find_active(ben.id).await.unwrap().is_none());

    let fresh = conversations
        .fetch_active(ben.id, Platform::Whatsapp)
        .await
        .unwrap();
    assert_ne!(fresh.id, Some(stale_id));
    assert!(fresh.active);
    assert!(fresh.messages.is_empty());
    assert!(fresh.context.is_empty());
    assert!(fresh.within_window(DateTime::now()));

    // The expiry index may already have removed it; if not, it is retired.
    if let Some(old) = conversations
        .base
        .find_one(doc! { "_id": stale_id })
        .await
        .unwrap()
    {
        assert!(!old.active);
    }

    let again = conversations
        .fetch_active(ben.id, Platform::Whatsapp)
        .await
        .unwrap();
    assert_eq!(again.id, fresh.id);
}

#[tokio::test]
async fn recent_conversation_is_reused() {
    let app = TestApp::spawn().await;
    let ben = app.seed_employee("Ben", "+15550900002").await;
    let conversations = &app.state.stores.conversations;

    let recent = Conversation {
        id: None,
        user_id: ben.id,
        platform: Platform::Whatsapp,
        messages: vec![ConversationMessage::user("hello", None)],
        context: Default::default(),
        active: true,
        last_activity: hours_ago(23),
        created_at: hours_ago(23),
        updated_at: hours_ago(23),
    };
    let recent_id = conversations.base.insert_one(&recent).await.unwrap();

    let fetched = conversations
        .fetch_active(ben.id, Platform::Whatsapp)
        .await
        .unwrap();
    assert_eq!(fetched.id, Some(recent_id));
    assert_eq!(fetched.messages.len(), 1);
}
