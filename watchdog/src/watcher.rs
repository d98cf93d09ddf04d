//! Polling a folder for new files.
//!
//! The watchdog remembers the names of the files it has seen. On every tick
//! it lists the folder again, and the files not seen before are uploaded.
//! Files present when the watchdog starts are never uploaded.

use crate::upload::{upload_file, ImageUploader, UploadOutcome};
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, WrapErr};
use std::collections::BTreeSet;
use std::time::Duration;

/// Which of the new files found in a tick are uploaded.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum TickMode {
    /// Every new file, in order of name.
    #[default]
    All,
    /// Only the new file which comes last by name. The others are
    /// remembered as seen, so they are never uploaded.
    LatestOnly,
}

pub struct FolderWatchdog<U> {
    folder: Utf8PathBuf,
    uploader: U,
    mode: TickMode,
    known: BTreeSet<String>,
}

impl<U: ImageUploader + Sync> FolderWatchdog<U> {
    /// Start watching `folder`. Fails if `folder` cannot be listed.
    pub fn new(folder: Utf8PathBuf, uploader: U, mode: TickMode) -> Result<Self> {
        let known = list_files(&folder)?;
        Ok(Self {
            folder,
            uploader,
            mode,
            known,
        })
    }

    pub fn folder(&self) -> &Utf8Path {
        &self.folder
    }

    /// List the folder once and upload the files which are new since the
    /// previous listing.
    ///
    /// Upload failures are logged and returned as outcomes. Only a failure
    /// to list the folder is an error.
    pub async fn poll_once(&mut self) -> Result<Vec<UploadOutcome>> {
        let snapshot = list_files(&self.folder)?;
        let new: Vec<&String> = snapshot.difference(&self.known).collect();
        let chosen = match self.mode {
            TickMode::All => new,
            TickMode::LatestOnly => {
                if new.len() > 1 {
                    log::warn!(
                        "{} new files, only uploading the last one. Skipped: {:?}",
                        new.len(),
                        &new[..new.len() - 1]
                    );
                }
                new.last().copied().into_iter().collect()
            }
        };
        let mut outcomes = Vec::with_capacity(chosen.len());
        for name in chosen {
            log::info!("New file: {}", name);
            let outcome = upload_file(&self.uploader, self.folder.join(name)).await;
            outcome.log();
            outcomes.push(outcome);
        }
        if !outcomes.is_empty() {
            let uploaded = outcomes.iter().filter(|o| o.is_uploaded()).count();
            log::debug!("{} of {} new files uploaded", uploaded, outcomes.len());
        }
        self.known = snapshot;
        Ok(outcomes)
    }

    /// Poll forever, sleeping `interval` after each tick.
    pub async fn run(mut self, interval: Duration) -> Result<()> {
        loop {
            self.poll_once().await?;
            tokio::time::sleep(interval).await;
        }
    }
}

/// Names of the regular files directly inside `folder`.
fn list_files(folder: &Utf8Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let entries =
        fs_err::read_dir(folder).wrap_err_with(|| format!("Cannot watch folder {}", folder))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(name) => log::warn!("Ignoring file with non-UTF-8 name {:?}", name),
        }
    }
    Ok(names)
}
