use std::sync::Arc;

use bson::{doc, oid::ObjectId, to_document};
use eyre::{Error, Result};
use futures_util::stream::TryStreamExt as _;
use log::info;
use model::access::RoleTag;
use model::session::Session;
use model::user::User;
use mongodb::options::UpdateOptions;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

const COLLECTION: &str = "users";

#[derive(Clone)]
pub struct UserStore {
    users: Arc<Collection<User>>,
}

impl UserStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let users: Collection<User> = db.collection(COLLECTION);
        users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .unique(true)
                            .build(),
                    )
                    .build(),
            )
            .await?;
        users
            .create_index(IndexModel::builder().keys(doc! { "role": 1 }).build())
            .await?;
        Ok(UserStore {
            users: Arc::new(users),
        })
    }

    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_by_email(&self, session: &mut Session, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_one(doc! { "email": email })
            .session(&mut *session)
            .await?)
    }

    /// Employees plus ALL managers, including top-level managers without a
    /// manager of their own.
    pub async fn rewards_participants(&self, session: &mut Session) -> Result<Vec<User>> {
        let filter = doc! {
            "role": { "$in": ["Employee", "Manager"] },
            "is_active": true,
        };
        let mut cursor = self.users.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn find_with_tag(&self, session: &mut Session, tag: RoleTag) -> Result<Vec<User>> {
        let filter = doc! { "dashboard_access": tag.to_string(), "is_active": true };
        let mut cursor = self.users.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, user: &User) -> Result<()> {
        info!("Inserting user {} <{}>", user.name, user.email);
        let result = self
            .users
            .update_one(
                doc! { "_id": user.id },
                doc! { "$setOnInsert": to_document(user)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("User already exists"));
        }
        Ok(())
    }

    pub async fn update(&self, session: &mut Session, user: &User) -> Result<()> {
        self.users
            .replace_one(doc! { "_id": user.id }, user)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn set_active(
        &self,
        session: &mut Session,
        id: ObjectId,
        is_active: bool,
    ) -> Result<()> {
        info!("Setting is_active={} for user {}", is_active, id);
        let result = self
            .users
            .update_one(doc! { "_id": id }, doc! { "$set": { "is_active": is_active } })
            .session(&mut *session)
            .await?;
        if result.matched_count == 0 {
            return Err(Error::msg("User not found"));
        }
        Ok(())
    }

    pub async fn all(&self, session: &mut Session) -> Result<Vec<User>> {
        let mut cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }
}
