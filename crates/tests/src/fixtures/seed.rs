use bson::{DateTime, oid::ObjectId};
use reqwest::Response;
use serde_json::{Value, json};
use shiftdesk_db::models::{Address, GeoPoint, Role, ScheduleNotificationPrefs, digits_only};
use shiftdesk_services::dao::{NewSchedule, NewUser};

use super::test_app::TestApp;

pub const PASSWORD: &str = "Password123!";

pub struct SeededUser {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    /// Phone as WhatsApp reports it: digits only.
    pub wa_id: String,
    pub token: String,
}

impl SeededUser {
    pub fn hex(&self) -> String {
        self.id.to_hex()
    }
}

/// Options for [`TestApp::seed_user`].
pub struct UserSpec<'a> {
    pub name: &'a str,
    pub role: Role,
    pub phone: Option<&'a str>,
    pub language: &'a str,
}

impl<'a> UserSpec<'a> {
    pub fn employee(name: &'a str, phone: &'a str) -> Self {
        Self {
            name,
            role: Role::Employee,
            phone: Some(phone),
            language: "en",
        }
    }

    pub fn admin(name: &'a str, phone: &'a str) -> Self {
        Self {
            name,
            role: Role::Admin,
            phone: Some(phone),
            language: "en",
        }
    }
}

impl TestApp {
    /// Inserts a user straight into the store and issues its token.
    pub async fn seed_user(&self, spec: UserSpec<'_>) -> SeededUser {
        let email = format!("{}@test.com", spec.name.to_lowercase().replace(' ', "."));
        let password_hash = self.state.auth.hash_password(PASSWORD).unwrap();
        let user = self
            .state
            .stores
            .users
            .create(NewUser {
                name: spec.name.to_string(),
                email: email.clone(),
                password_hash,
                phone: spec.phone.map(str::to_string),
                role: spec.role,
                team_id: None,
                position: Some("Operator".to_string()),
                department: Some("Assembly".to_string()),
                preferred_language: Some(spec.language.to_string()),
                notification_preferences: None,
            })
            .await
            .expect("Failed to seed user");
        let id = user.id.unwrap();
        let token = self.state.auth.issue_token(id, spec.role).unwrap();

        SeededUser {
            id,
            name: user.name,
            email,
            wa_id: spec.phone.map(digits_only).unwrap_or_default(),
            token,
        }
    }

    pub async fn seed_admin(&self, name: &str, phone: &str) -> SeededUser {
        self.seed_user(UserSpec::admin(name, phone)).await
    }

    pub async fn seed_employee(&self, name: &str, phone: &str) -> SeededUser {
        self.seed_user(UserSpec::employee(name, phone)).await
    }

    pub async fn seed_location(&self, name: &str) -> ObjectId {
        let location = self
            .state
            .stores
            .locations
            .create(
                name.to_string(),
                Address {
                    street: "1 Industrial Way".to_string(),
                    city: "Lyon".to_string(),
                    postal_code: "69007".to_string(),
                    country: "France".to_string(),
                },
                GeoPoint {
                    lat: 45.75,
                    lon: 4.85,
                },
                None,
            )
            .await
            .expect("Failed to seed location");
        location.id.unwrap()
    }

    /// Inserts a shift without sending any notification.
    pub async fn seed_schedule(
        &self,
        title: &str,
        location_id: ObjectId,
        employees: Vec<ObjectId>,
        created_by: ObjectId,
        start: chrono::DateTime<chrono::Utc>,
    ) -> ObjectId {
        let start_time = DateTime::from_chrono(start);
        let schedule = self
            .state
            .stores
            .schedules
            .create(NewSchedule {
                title: title.to_string(),
                date: self
                    .state
                    .clock
                    .start_of_day(self.state.clock.local_date(start_time)),
                start_time,
                end_time: DateTime::from_chrono(start + chrono::Duration::hours(8)),
                location_id,
                employees,
                allow_auto_replacement: false,
                notification_preferences: ScheduleNotificationPrefs::default(),
                team_id: None,
                created_by,
                notes: None,
            })
            .await
            .expect("Failed to seed schedule");
        schedule.id.unwrap()
    }

    /// Posts a webhook event carrying one inbound message.
    pub async fn send_inbound(&self, message: Value) -> Response {
        let event = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "entry-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [message],
                    },
                }],
            }],
        });
        self.client
            .post(self.url("/api/whatsapp/webhook"))
            .json(&event)
            .send()
            .await
            .expect("Webhook request failed")
    }

    pub async fn send_inbound_text(&self, from: &str, body: &str) -> Response {
        self.send_inbound(json!({
            "from": from,
            "id": format!("wamid.{}", ObjectId::new().to_hex()),
            "type": "text",
            "text": { "body": body },
        }))
        .await
    }

    pub async fn send_inbound_audio(&self, from: &str, media_id: &str) -> Response {
        self.send_inbound(json!({
            "from": from,
            "id": format!("wamid.{}", ObjectId::new().to_hex()),
            "type": "audio",
            "audio": { "id": media_id, "mime_type": "audio/ogg; codecs=opus" },
        }))
        .await
    }

    /// Sends an inbound text and waits for `count` replies to that number.
    pub async fn converse(&self, from: &str, body: &str) -> Vec<String> {
        let before = self.whatsapp.sent_to(from).len();
        let resp = self.send_inbound_text(from, body).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert!(
            self.eventually(|| self.whatsapp.sent_to(from).len() > before)
                .await,
            "no reply to {body:?}"
        );
        self.whatsapp
            .sent_to(from)
            .into_iter()
            .skip(before)
            .filter_map(|o| o.text().map(str::to_string))
            .collect()
    }
}
