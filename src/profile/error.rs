//! Errors from account operations and form validation.

use uuid::Uuid;

use crate::identity::InvalidProfile;
use crate::identity::phone::InvalidPhoneNumber;
use crate::platform::PlatformError;

use super::avatar::MAX_AVATAR_BYTES;
use super::registration::MIN_PASSWORD_LEN;

/// Form input rejected before any platform call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error(transparent)]
    Phone(#[from] InvalidPhoneNumber),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("avatar file is empty")]
    Empty,
    #[error("avatar must be an image, got {0}")]
    NotAnImage(String),
    #[error("avatar is {size} bytes; the limit is {}", MAX_AVATAR_BYTES)]
    TooLarge { size: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("no profile for account {0}")]
    UnknownAccount(Uuid),
    #[error("target profile is invalid: {0}")]
    InvalidTarget(#[from] InvalidProfile),
    #[error(transparent)]
    Platform(PlatformError),
}

impl From<PlatformError> for ProfileError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Conflict(_) => Self::EmailTaken,
            other => Self::Platform(other),
        }
    }
}
