use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use eyre::Result;
use futures_util::stream::TryStreamExt as _;
use model::category::{Category, Department, UTILIZATION_CODE, UTILIZATION_NAME};
use model::session::Session;
use mongodb::{Collection, IndexModel};

use crate::session::Db;

/// Newer-generation categories; writes go here.
const HR_COLLECTION: &str = "hr_categories";
/// Legacy categories, kept read-only but still referenced by old requests.
const LEGACY_COLLECTION: &str = "categories";

#[derive(Clone)]
pub struct CategoryStore {
    hr: Arc<Collection<Category>>,
    legacy: Arc<Collection<Category>>,
}

impl CategoryStore {
    pub(crate) async fn new(db: &Db) -> Result<Self> {
        let hr: Collection<Category> = db.collection(HR_COLLECTION);
        hr.create_index(
            IndexModel::builder()
                .keys(doc! { "category_code": 1 })
                .build(),
        )
        .await?;
        Ok(CategoryStore {
            hr: Arc::new(hr),
            legacy: Arc::new(db.collection(LEGACY_COLLECTION)),
        })
    }

    /// Resolve an id, newer collection first.
    pub async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Option<Category>> {
        if let Some(category) = self
            .hr
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?
        {
            return Ok(Some(category));
        }
        Ok(self
            .legacy
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn hr_all(&self, session: &mut Session) -> Result<Vec<Category>> {
        let mut cursor = self.hr.find(doc! {}).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn legacy_all(&self, session: &mut Session) -> Result<Vec<Category>> {
        let mut cursor = self.legacy.find(doc! {}).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    /// Every id of the utilization category, across both generations.
    /// There may be several documents with different ids.
    pub async fn utilization_ids(&self, session: &mut Session) -> Result<Vec<ObjectId>> {
        let mut ids = Vec::new();
        let hr_filter = doc! {
            "$or": [
                { "category_code": UTILIZATION_CODE },
                { "name": UTILIZATION_NAME },
            ]
        };
        let mut cursor = self.hr.find(hr_filter).session(&mut *session).await?;
        while let Some(category) = cursor.next(&mut *session).await {
            ids.push(category?.id);
        }

        let legacy_filter = doc! {
            "$or": [
                { "code": UTILIZATION_CODE },
                { "name": UTILIZATION_NAME },
            ]
        };
        let mut cursor = self.legacy.find(legacy_filter).session(&mut *session).await?;
        while let Some(category) = cursor.next(&mut *session).await {
            let category = category?;
            if !ids.contains(&category.id) {
                ids.push(category.id);
            }
        }
        Ok(ids)
    }

    /// Ids of every category a department owns, across both generations.
    pub async fn department_ids(
        &self,
        session: &mut Session,
        department: Department,
    ) -> Result<Vec<ObjectId>> {
        let filter = doc! {
            "category_department": {
                "$regex": format!("^{}", department),
                "$options": "i",
            }
        };
        let mut ids = Vec::new();
        let mut cursor = self
            .hr
            .find(filter.clone())
            .session(&mut *session)
            .await?;
        while let Some(category) = cursor.next(&mut *session).await {
            ids.push(category?.id);
        }
        let mut cursor = self.legacy.find(filter).session(&mut *session).await?;
        while let Some(category) = cursor.next(&mut *session).await {
            let category = category?;
            if !ids.contains(&category.id) {
                ids.push(category.id);
            }
        }
        Ok(ids)
    }

    /// Lookup restricted to the writable generation.
    pub async fn get_hr(&self, session: &mut Session, id: ObjectId) -> Result<Option<Category>> {
        Ok(self
            .hr
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn find_hr_by_code(
        &self,
        session: &mut Session,
        code: &str,
    ) -> Result<Option<Category>> {
        Ok(self
            .hr
            .find_one(doc! { "category_code": code })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert_hr(&self, session: &mut Session, category: &Category) -> Result<()> {
        self.hr
            .insert_one(category)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn update_hr(&self, session: &mut Session, category: &Category) -> Result<()> {
        self.hr
            .replace_one(doc! { "_id": category.id }, category)
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
