use std::time::Duration;

use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{
    Absence, Conversation, HourTracking, Location, Notification, Schedule, Team, User,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index(bson::doc! { "phone": 1 }),
            index(bson::doc! { "team_id": 1, "role": 1 }),
        ],
    )
    .await?;

    // Teams
    create_indexes(
        db,
        Team::COLLECTION,
        vec![
            index_unique(bson::doc! { "join_code": 1 }),
            index(bson::doc! { "owner_id": 1 }),
        ],
    )
    .await?;

    // Locations
    create_indexes(
        db,
        Location::COLLECTION,
        vec![index(bson::doc! { "team_id": 1, "is_active": 1 })],
    )
    .await?;

    // Schedules
    create_indexes(
        db,
        Schedule::COLLECTION,
        vec![
            index(bson::doc! { "employees": 1, "start_time": 1 }),
            index(bson::doc! { "start_time": 1 }),
            index(bson::doc! { "location_id": 1 }),
        ],
    )
    .await?;

    // Absences
    create_indexes(
        db,
        Absence::COLLECTION,
        vec![
            index(bson::doc! { "status": 1, "created_at": 1 }),
            index(bson::doc! { "user_id": 1, "status": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Hour tracking: one open record per user and day
    create_indexes(
        db,
        HourTracking::COLLECTION,
        vec![
            index_partial_unique(
                bson::doc! { "user_id": 1, "day": 1 },
                bson::doc! { "status": "active" },
            ),
            index(bson::doc! { "user_id": 1, "clock_in": -1 }),
        ],
    )
    .await?;

    // Notifications
    create_indexes(
        db,
        Notification::COLLECTION,
        vec![
            index(bson::doc! { "recipient_id": 1, "created_at": -1 }),
            index(bson::doc! { "relation": 1, "related_id": 1 }),
        ],
    )
    .await?;

    // Conversations: one active per user, expired by the TTL monitor
    create_indexes(
        db,
        Conversation::COLLECTION,
        vec![
            index_partial_unique(
                bson::doc! { "user_id": 1 },
                bson::doc! { "active": true },
            ),
            index_ttl(
                bson::doc! { "last_activity": 1 },
                Duration::from_secs(Conversation::SESSION_WINDOW_SECS as u64),
            ),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_partial_unique(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

fn index_ttl(keys: bson::Document, expire_after: Duration) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().expire_after(expire_after).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
