use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt as _;
use model::award::Award;
use model::session::Session;
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "awards";

/// The append-only awarded-points ledger.
#[derive(Clone)]
pub struct AwardStore {
    awards: Arc<Collection<Award>>,
}

impl AwardStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let awards: Collection<Award> = db.collection(COLLECTION);
        awards
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "effective_date": -1 })
                    .build(),
            )
            .await?;
        // One award per originating request, enforced by the database.
        awards
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "request_id": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
            )
            .await?;
        Ok(AwardStore {
            awards: Arc::new(awards),
        })
    }

    pub async fn add(&self, session: &mut Session, award: &Award) -> Result<(), Error> {
        self.awards
            .insert_one(award)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn for_user(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Award>, Error> {
        let mut filter = doc! { "user_id": user_id };
        apply_range(&mut filter, range);
        self.collect(session, filter).await
    }

    pub async fn for_users(
        &self,
        session: &mut Session,
        user_ids: &[ObjectId],
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Award>, Error> {
        let mut filter = doc! { "user_id": { "$in": user_ids } };
        apply_range(&mut filter, range);
        self.collect(session, filter).await
    }

    pub async fn in_range(
        &self,
        session: &mut Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Award>, Error> {
        let mut filter = doc! {};
        apply_range(&mut filter, Some((from, to)));
        self.collect(session, filter).await
    }

    /// Utilization entries for one user, any date; callers filter by
    /// effective date so historical records are never missed.
    pub async fn utilization_for_user(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        utilization_ids: &[ObjectId],
    ) -> Result<Vec<Award>, Error> {
        let filter = doc! {
            "user_id": user_id,
            "category_id": { "$in": utilization_ids },
        };
        self.collect(session, filter).await
    }

    /// The milestone bonus paid to a user in a quarter, if any.
    pub async fn bonus_in_quarter(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        quarter_label: &str,
    ) -> Result<Option<Award>, Error> {
        Ok(self
            .awards
            .find_one(doc! {
                "user_id": user_id,
                "is_bonus": true,
                "bonus_quarter": quarter_label,
            })
            .session(&mut *session)
            .await?)
    }

    /// Calendar `(year, month)` pairs that have ledger entries; the
    /// dashboards derive selectable fiscal years from these.
    pub async fn months_with_data(
        &self,
        session: &mut Session,
    ) -> Result<Vec<(i32, u32)>, Error> {
        let pipeline = vec![
            doc! { "$project": {
                "year": { "$year": "$effective_date" },
                "month": { "$month": "$effective_date" },
            }},
            doc! { "$group": { "_id": { "year": "$year", "month": "$month" } } },
            doc! { "$sort": { "_id.year": -1, "_id.month": -1 } },
        ];
        let mut cursor = self
            .awards
            .aggregate(pipeline)
            .session(&mut *session)
            .await?;
        let mut months = Vec::new();
        while let Some(document) = cursor.next(&mut *session).await {
            let document: Document = document?;
            if let Ok(id) = document.get_document("_id") {
                if let (Ok(year), Ok(month)) = (id.get_i32("year"), id.get_i32("month")) {
                    months.push((year, month as u32));
                }
            }
        }
        Ok(months)
    }

    async fn collect(
        &self,
        session: &mut Session,
        filter: Document,
    ) -> Result<Vec<Award>, Error> {
        let mut cursor = self
            .awards
            .find(filter)
            .sort(doc! { "effective_date": -1 })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }
}

fn apply_range(filter: &mut Document, range: Option<(DateTime<Utc>, DateTime<Utc>)>) {
    if let Some((from, to)) = range {
        filter.insert(
            "effective_date",
            doc! {
                "$gte": bson::DateTime::from_chrono(from),
                "$lte": bson::DateTime::from_chrono(to),
            },
        );
    }
}
