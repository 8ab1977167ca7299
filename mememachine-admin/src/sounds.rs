use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};

use crate::util::new_id;

/// Number of sounds shown per page
pub const PAGE_SIZE: usize = 50;

const SOUND_EXTENSION: &str = ".mp3";
const PARTIAL_EXTENSION: &str = ".part";

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("The sound(s) exceed the maximum upload size of {max_bytes} bytes!")]
    TooLarge { max_bytes: u64 },
    #[error("{0} is not a valid sound name")]
    InvalidName(String),
    #[error("Only .mp3 files can be uploaded, got {0}")]
    UnsupportedType(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One page of the sound listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPage {
    pub files: Vec<String>,
    pub page: usize,
    pub total: usize,
    pub page_count: usize,
    pub first_page: bool,
    pub last_page: bool,
}

/// The directory of sounds the bot plays from
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    path: PathBuf,
    max_upload_size: u64,
}

impl SoundLibrary {
    pub fn new(path: impl Into<PathBuf>, max_upload_size: u64) -> Self {
        Self {
            path: path.into(),
            max_upload_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Creates the sound directory if it doesn't exist yet
    pub async fn prepare(&self) -> Result<(), SoundError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Lists one page of sounds, sorted by name. Pages start at 1.
    pub async fn list(&self, page: usize) -> Result<SoundPage, SoundError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(SOUND_EXTENSION) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();

        let total = files.len();
        let page_count = total.div_ceil(PAGE_SIZE).max(1);
        let page = page.max(1);

        let files = files
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(PAGE_SIZE))
            .take(PAGE_SIZE)
            .collect();

        Ok(SoundPage {
            files,
            page,
            total,
            page_count,
            first_page: page == 1,
            last_page: page >= page_count,
        })
    }

    /// Removes a sound from the directory
    pub async fn delete(&self, name: &str) -> Result<(), SoundError> {
        check_name(name)?;

        match fs::remove_file(self.path.join(name)).await {
            Ok(()) => {
                info!("Deleted sound {}", name);
                Ok(())
            }
            Err(e) => {
                warn!("Could not delete sound {}: {}", name, e);
                Err(e.into())
            }
        }
    }

    /// Starts writing an uploaded sound. Spaces in the name become underscores.
    pub async fn upload(&self, file_name: &str) -> Result<SoundWriter, SoundError> {
        let name = file_name.trim().replace(' ', "_");
        check_name(&name)?;

        if !name.ends_with(SOUND_EXTENSION) {
            return Err(SoundError::UnsupportedType(name));
        }

        // Every upload gets its own partial file, so concurrent uploads of one name can't mix
        let target_path = self.path.join(&name);
        let part_path = self.path.join(format!("{name}.{}{PARTIAL_EXTENSION}", new_id()));
        let file = File::create(&part_path).await?;

        Ok(SoundWriter {
            name,
            file,
            part: PartFile {
                path: part_path,
                armed: true,
            },
            target_path,
            written: 0,
            max_bytes: self.max_upload_size,
        })
    }
}

/// An upload in progress. Nothing is visible in the listing until [SoundWriter::finish],
/// and dropping an unfinished writer removes what was written.
pub struct SoundWriter {
    name: String,
    file: File,
    part: PartFile,
    target_path: PathBuf,
    written: u64,
    max_bytes: u64,
}

impl SoundWriter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a chunk. Exceeding the limit removes everything written so far.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), SoundError> {
        self.written += chunk.len() as u64;

        if self.written > self.max_bytes {
            remove_if_exists(&self.part.path).await?;
            return Err(SoundError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        self.file.write_all(chunk).await?;
        Ok(())
    }

    /// Moves the sound into place, overwriting any sound with the same name
    pub async fn finish(mut self) -> Result<String, SoundError> {
        self.file.flush().await?;
        drop(self.file);

        fs::rename(&self.part.path, &self.target_path).await?;
        self.part.armed = false;

        info!("Uploaded sound {} ({} bytes)", self.name, self.written);

        Ok(self.name)
    }

    /// Discards the upload
    pub async fn abort(mut self) -> Result<(), SoundError> {
        drop(self.file);

        remove_if_exists(&self.part.path).await?;
        self.part.armed = false;

        Ok(())
    }
}

/// The partial file behind a [SoundWriter], removed on drop unless disarmed
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                warn!("Could not remove partial upload {}: {}", self.path.display(), e)
            }
            _ => {}
        }
    }
}

fn check_name(name: &str) -> Result<(), SoundError> {
    let is_valid = !name.is_empty()
        && !name.contains(|c: char| c == '/' || c == '\\')
        && !name.contains("..")
        && !name.ends_with(PARTIAL_EXTENSION);

    if is_valid {
        Ok(())
    } else {
        Err(SoundError::InvalidName(name.to_string()))
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), SoundError> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
