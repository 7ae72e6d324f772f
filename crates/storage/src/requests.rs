use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt as _;
use model::request::{PointsRequest, RequestStatus};
use model::session::Session;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "points_request";

#[derive(Clone)]
pub struct RequestStore {
    requests: Arc<Collection<PointsRequest>>,
}

impl RequestStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let requests: Collection<PointsRequest> = db.collection(COLLECTION);
        requests
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "status": 1, "category_id": 1 })
                    .build(),
            )
            .await?;
        requests
            .create_index(IndexModel::builder().keys(doc! { "user_id": 1 }).build())
            .await?;
        requests
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "request_date": -1 })
                    .build(),
            )
            .await?;
        Ok(RequestStore {
            requests: Arc::new(requests),
        })
    }

    pub async fn add(&self, session: &mut Session, request: &PointsRequest) -> Result<(), Error> {
        self.requests
            .insert_one(request)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn get(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<PointsRequest>, Error> {
        Ok(self
            .requests
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn update(&self, session: &mut Session, request: &PointsRequest) -> Result<(), Error> {
        self.requests
            .replace_one(doc! { "_id": request.id }, request)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    /// Pending queue for a validator: every request whose category the
    /// department currently owns, oldest first.
    pub async fn pending_for_categories(
        &self,
        session: &mut Session,
        category_ids: &[ObjectId],
    ) -> Result<Vec<PointsRequest>, Error> {
        let filter = doc! {
            "status": "Pending",
            "category_id": { "$in": category_ids },
        };
        let mut cursor = self
            .requests
            .find(filter)
            .sort(doc! { "request_date": 1 })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn for_user(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PointsRequest>, Error> {
        let mut filter = doc! { "user_id": user_id };
        if let Some(status) = status {
            filter.insert("status", bson::to_bson(&status)?);
        }
        let mut cursor = self
            .requests
            .find(filter)
            .sort(doc! { "request_date": -1 })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }
}
