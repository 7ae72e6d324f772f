use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use chrono::Utc;
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt as _;
use model::notification::Notification;
use model::session::Session;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "notifications";

/// Messages are abandoned after this many delivery failures.
pub const MAX_ATTEMPTS: u32 = 5;

/// Email outbox. Entries are written transactionally next to the data
/// change they announce and drained by the background process.
#[derive(Clone)]
pub struct NotificationStore {
    notifications: Arc<Collection<Notification>>,
}

impl NotificationStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let notifications: Collection<Notification> = db.collection(COLLECTION);
        notifications
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "sent_at": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(NotificationStore {
            notifications: Arc::new(notifications),
        })
    }

    pub async fn add(
        &self,
        session: &mut Session,
        notification: &Notification,
    ) -> Result<(), Error> {
        self.notifications
            .insert_one(notification)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn unsent(
        &self,
        session: &mut Session,
        limit: i64,
    ) -> Result<Vec<Notification>, Error> {
        let filter = doc! {
            "sent_at": null,
            "attempts": { "$lt": MAX_ATTEMPTS },
        };
        let mut cursor = self
            .notifications
            .find(filter)
            .sort(doc! { "created_at": 1 })
            .limit(limit)
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn mark_sent(&self, session: &mut Session, id: ObjectId) -> Result<(), Error> {
        self.notifications
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "sent_at": bson::DateTime::from_chrono(Utc::now()) },
                    "$inc": { "attempts": 1 },
                },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        session: &mut Session,
        id: ObjectId,
        error: &str,
    ) -> Result<(), Error> {
        self.notifications
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "last_error": error },
                    "$inc": { "attempts": 1 },
                },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
