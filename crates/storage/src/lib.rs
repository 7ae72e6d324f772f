pub mod attachments;
pub mod awards;
pub mod categories;
pub mod config;
pub mod notifications;
pub mod requests;
pub mod session;
pub mod users;

use attachments::AttachmentStore;
use awards::AwardStore;
use categories::CategoryStore;
use config::ConfigStore;
use eyre::Result;
use notifications::NotificationStore;
use requests::RequestStore;
use session::Db;
use users::UserStore;

const DB_NAME: &str = "rewards_db";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub users: UserStore,
    pub categories: CategoryStore,
    pub requests: RequestStore,
    pub awards: AwardStore,
    pub config: ConfigStore,
    pub notifications: NotificationStore,
    pub attachments: AttachmentStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::new(uri, DB_NAME).await?;
        let users = UserStore::new(&db).await?;
        let categories = CategoryStore::new(&db).await?;
        let requests = RequestStore::new(&db).await?;
        let awards = AwardStore::new(&db).await?;
        let config = ConfigStore::new(&db);
        let notifications = NotificationStore::new(&db).await?;
        let attachments = AttachmentStore::new(&db);

        Ok(Storage {
            db,
            users,
            categories,
            requests,
            awards,
            config,
            notifications,
            attachments,
        })
    }
}
