use bson::{doc, oid::ObjectId, Bson};
use eyre::{eyre, Error, Result};
use futures_util::io::{AsyncReadExt as _, AsyncWriteExt as _};
use futures_util::StreamExt as _;
use mongodb::gridfs::GridFsBucket;
use mongodb::options::GridFsBucketOptions;

use crate::session::Db;

const BUCKET: &str = "attachments";

pub struct AttachmentMeta {
    pub filename: String,
    pub content_type: String,
}

/// Request attachments in GridFS. Uploads happen before the request is
/// submitted, so these writes sit outside the request transaction.
#[derive(Clone)]
pub struct AttachmentStore {
    bucket: GridFsBucket,
}

impl AttachmentStore {
    pub(crate) fn new(db: &Db) -> Self {
        let options = GridFsBucketOptions::builder()
            .bucket_name(BUCKET.to_string())
            .build();
        AttachmentStore {
            bucket: db.gridfs_bucket(options),
        }
    }

    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ObjectId, Error> {
        let mut stream = self
            .bucket
            .open_upload_stream(filename)
            .metadata(doc! {
                "original_filename": filename,
                "content_type": content_type,
            })
            .await?;
        let id = stream
            .id()
            .as_object_id()
            .ok_or_else(|| eyre!("GridFS assigned a non-ObjectId file id"))?;
        stream.write_all(bytes).await?;
        stream.close().await?;
        Ok(id)
    }

    pub async fn download(&self, id: ObjectId) -> Result<(AttachmentMeta, Vec<u8>), Error> {
        let mut files = self.bucket.find(doc! { "_id": id }).await?;
        let file = files
            .next()
            .await
            .transpose()?
            .ok_or_else(|| eyre!("Attachment {} not found", id))?;

        let metadata = file.metadata.unwrap_or_default();
        let meta = AttachmentMeta {
            filename: metadata
                .get_str("original_filename")
                .ok()
                .map(str::to_string)
                .or(file.filename)
                .unwrap_or_else(|| "attachment".to_string()),
            content_type: metadata
                .get_str("content_type")
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        let mut stream = self
            .bucket
            .open_download_stream(Bson::ObjectId(id))
            .await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        Ok((meta, bytes))
    }

    pub async fn delete(&self, id: ObjectId) -> Result<(), Error> {
        self.bucket.delete(Bson::ObjectId(id)).await?;
        Ok(())
    }
}
