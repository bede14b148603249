//! Media service
//!
//! Validates uploads against the configured allow-list and size cap, writes
//! them to the upload directory and records them in the media table.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::repositories::MediaRepository;
use crate::models::{Actor, ListParams, Media, MediaFilter, PagedResult, UpdateMediaInput};
use crate::services::error::{ServiceError, ServiceResult, INSUFFICIENT_PERMISSIONS};

const MEDIA_NOT_FOUND: &str = "Media not found";

/// A file received from a client, before validation
#[derive(Debug, Clone)]
pub struct UploadedFile<'a> {
    pub original_name: String,
    pub mime_type: String,
    pub data: &'a [u8],
}

pub struct MediaService {
    media_repo: Arc<dyn MediaRepository>,
    config: Arc<UploadConfig>,
}

impl MediaService {
    pub fn new(media_repo: Arc<dyn MediaRepository>, config: Arc<UploadConfig>) -> Self {
        Self { media_repo, config }
    }

    pub async fn list(&self, filter: &MediaFilter, params: &ListParams) -> ServiceResult<PagedResult<Media>> {
        let (items, total) = self.media_repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Media> {
        self.media_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MEDIA_NOT_FOUND))
    }

    /// Validate, store and record an uploaded file.
    pub async fn upload(&self, actor: &Actor, file: UploadedFile<'_>) -> ServiceResult<Media> {
        if !self.config.is_type_allowed(&file.mime_type) {
            return Err(ServiceError::validation("File type not allowed"));
        }
        if file.data.len() as u64 > self.config.max_file_size {
            return Err(ServiceError::validation("File size too large"));
        }

        let filename = stored_filename(&file.original_name);
        let path = self.file_path(&filename);

        fs::create_dir_all(&self.config.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir: {}", e))?;
        fs::write(&path, file.data)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to save file {}: {}", path.display(), e))?;

        let media = Media::new(
            filename,
            file.original_name,
            file.mime_type,
            file.data.len() as i64,
            actor.id,
        );

        match self.media_repo.create(&media).await {
            Ok(created) => {
                tracing::info!("Stored upload {} ({} bytes)", created.filename, created.size);
                Ok(created)
            }
            Err(e) => {
                remove_file_logged(&path).await;
                Err(e.into())
            }
        }
    }

    /// Update alt text and caption.
    pub async fn update(&self, actor: &Actor, id: i64, input: UpdateMediaInput) -> ServiceResult<Media> {
        let mut media = self.get(id).await?;
        if !actor.can_manage(media.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if let Some(alt) = input.alt {
            media.alt = Some(alt);
        }
        if let Some(caption) = input.caption {
            media.caption = Some(caption);
        }

        Ok(self.media_repo.update(&media).await?)
    }

    /// Delete the record and its file. A file that cannot be removed is
    /// logged and left behind.
    pub async fn delete(&self, actor: &Actor, id: i64) -> ServiceResult<i64> {
        let media = self.get(id).await?;
        if !actor.can_manage(media.author_id) {
            return Err(ServiceError::forbidden(INSUFFICIENT_PERMISSIONS));
        }

        if !self.media_repo.delete(id).await? {
            return Err(ServiceError::not_found(MEDIA_NOT_FOUND));
        }
        remove_file_logged(&self.file_path(&media.filename)).await;

        tracing::info!("Media {} deleted by user {}", media.filename, actor.id);
        Ok(id)
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.config.path.join(filename)
    }
}

async fn remove_file_logged(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
    }
}

/// `<millis>-<random><.ext>`, keeping the original extension when it is a
/// plain alphanumeric one.
fn stored_filename(original_name: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        &random[..8],
        extension_of(original_name)
    )
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxMediaRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};
    use tempfile::TempDir;

    struct Fixture {
        service: MediaService,
        owner: Actor,
        other: Actor,
        uploads: PathBuf,
        _dir: TempDir,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let owner = users
            .create(&User::new("owner".into(), "owner@example.com".into(), "hash".into(), UserRole::Author))
            .await
            .unwrap();
        let other = users
            .create(&User::new("other".into(), "other@example.com".into(), "hash".into(), UserRole::Editor))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let uploads = dir.path().join("uploads");
        let config = UploadConfig {
            path: uploads.clone(),
            max_file_size: 16,
            ..Default::default()
        };

        Fixture {
            service: MediaService::new(SqlxMediaRepository::boxed(pool), Arc::new(config)),
            owner: Actor::new(owner.id, owner.role),
            other: Actor::new(other.id, other.role),
            uploads,
            _dir: dir,
        }
    }

    fn file<'a>(name: &str, mime: &str, data: &'a [u8]) -> UploadedFile<'a> {
        UploadedFile {
            original_name: name.to_string(),
            mime_type: mime.to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_row() {
        let f = setup().await;
        let media = f
            .service
            .upload(&f.owner, file("photo.PNG", "image/png", b"fake png"))
            .await
            .unwrap();

        assert!(media.filename.ends_with(".PNG"));
        assert_eq!(media.url, format!("/uploads/{}", media.filename));
        assert_eq!(media.original_name, "photo.PNG");
        assert_eq!(media.mime_type, "image/png");
        assert_eq!(media.size, 8);
        assert_eq!(media.author_id, f.owner.id);

        let stored = std::fs::read(f.uploads.join(&media.filename)).unwrap();
        assert_eq!(stored, b"fake png");
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let f = setup().await;

        let err = f
            .service
            .upload(&f.owner, file("run.exe", "application/x-msdownload", b"MZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "File type not allowed"));

        let err = f
            .service
            .upload(&f.owner, file("big.txt", "text/plain", &[b'a'; 17]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "File size too large"));
    }

    #[tokio::test]
    async fn test_update_alt_and_caption() {
        let f = setup().await;
        let media = f
            .service
            .upload(&f.owner, file("a.txt", "text/plain", b"hello"))
            .await
            .unwrap();

        let input = || UpdateMediaInput {
            alt: Some("Alt".into()),
            caption: None,
        };
        assert!(matches!(
            f.service.update(&f.other, media.id, input()).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let updated = f.service.update(&f.owner, media.id, input()).await.unwrap();
        assert_eq!(updated.alt.as_deref(), Some("Alt"));
        assert!(updated.caption.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let f = setup().await;
        let media = f
            .service
            .upload(&f.owner, file("doc.pdf", "application/pdf", b"%PDF"))
            .await
            .unwrap();
        let path = f.uploads.join(&media.filename);
        assert!(path.exists());

        assert!(matches!(
            f.service.delete(&f.other, media.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));
        assert_eq!(f.service.delete(&f.owner, media.id).await.unwrap(), media.id);
        assert!(!path.exists());
        assert!(matches!(
            f.service.get(media.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_file() {
        let f = setup().await;
        let media = f
            .service
            .upload(&f.owner, file("gone.txt", "text/plain", b"x"))
            .await
            .unwrap();
        std::fs::remove_file(f.uploads.join(&media.filename)).unwrap();

        assert_eq!(f.service.delete(&f.owner, media.id).await.unwrap(), media.id);
    }

    #[test]
    fn test_stored_filename_shape() {
        let name = stored_filename("holiday photo.jpeg");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest.len(), 8 + ".jpeg".len());
        assert!(rest.ends_with(".jpeg"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.png"), ".png");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of("weird.p$p"), "");
    }
}
