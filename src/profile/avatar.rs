//! Avatar image checks and storage paths.

use std::fmt;

use rand::Rng;
use uuid::Uuid;

use super::error::UploadError;

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Folder inside the avatar bucket that holds every avatar object.
const AVATAR_FOLDER: &str = "avatars";

#[derive(Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AvatarUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl AvatarUpload {
    /// # Errors
    ///
    /// Rejects empty files, non-image content types and files over
    /// [`MAX_AVATAR_BYTES`].
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if !self.content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(UploadError::NotAnImage(self.content_type.clone()));
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(UploadError::TooLarge { size: self.bytes.len() });
        }
        Ok(())
    }

    /// Extension taken from the file name, falling back to the MIME subtype.
    #[must_use]
    pub fn extension(&self) -> String {
        let from_name = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        let from_type = || {
            self.content_type
                .split_once('/')
                .map(|(_, subtype)| subtype.split(['+', ';']).next().unwrap_or(subtype).trim())
                .filter(|subtype| !subtype.is_empty())
        };
        from_name
            .or_else(from_type)
            .unwrap_or("img")
            .to_ascii_lowercase()
    }
}

/// `avatars/{owner}-{random}.{ext}` so each upload gets a fresh object.
#[must_use]
pub fn avatar_object_path(owner: Uuid, extension: &str) -> String {
    let suffix: u64 = rand::rng().random();
    format!("{AVATAR_FOLDER}/{owner}-{suffix:016x}.{extension}")
}
