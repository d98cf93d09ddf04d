use async_trait::async_trait;
use breadboard::types::ImageName;
use breadboard::BreadboardClient;
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{OptionExt, Result};
use time::OffsetDateTime;

/// A file which appeared in the watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// File name without its extension.
    pub name: ImageName,
    pub path: Utf8PathBuf,
    /// When the file was created, or last modified if the platform does not
    /// record creation times.
    pub created: OffsetDateTime,
}

impl ImageFile {
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        let stem = path.file_stem().ok_or_eyre("file has no name")?;
        let metadata = fs_err::metadata(path)?;
        let created = metadata.created().or_else(|_| metadata.modified())?;
        Ok(Self {
            name: ImageName::new(stem.to_string()),
            path: path.to_path_buf(),
            created: created.into(),
        })
    }
}

/// Something which can register a new image.
#[async_trait]
pub trait ImageUploader {
    async fn upload(&self, image: &ImageFile) -> Result<()>;
}

#[async_trait]
impl ImageUploader for BreadboardClient {
    async fn upload(&self, image: &ImageFile) -> Result<()> {
        self.post_image(&image.name, image.created, Some(image.path.as_str()))
            .await?;
        Ok(())
    }
}

/// What happened to a new file.
#[derive(Debug)]
pub enum UploadOutcome {
    Uploaded(ImageFile),
    Failed {
        path: Utf8PathBuf,
        error: color_eyre::Report,
    },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded(_))
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Uploaded(image) => &image.path,
            Self::Failed { path, .. } => path,
        }
    }

    pub(crate) fn log(&self) {
        match self {
            Self::Uploaded(image) => log::info!("Uploaded {} ({})", image.name, image.path),
            Self::Failed { error, .. } => {
                log::warn!("Could not upload {}: {:#}", self.path(), error)
            }
        }
    }
}

/// Upload `path`. Failures are returned as an outcome rather than an error.
pub async fn upload_file(uploader: &(impl ImageUploader + Sync), path: Utf8PathBuf) -> UploadOutcome {
    let result = match ImageFile::from_path(&path) {
        Ok(image) => uploader.upload(&image).await.map(|_| image),
        Err(e) => Err(e),
    };
    match result {
        Ok(image) => UploadOutcome::Uploaded(image),
        Err(error) => UploadOutcome::Failed { path, error },
    }
}
