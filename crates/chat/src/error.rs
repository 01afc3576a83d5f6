use std::path::PathBuf;

use snafu::Snafu;

use crate::composer::DictationError;

/// Chat-level failures.
///
/// Display strings double as the user-visible notice text, so they are phrased for people.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatError {
    #[snafu(display("Please enter a question or upload an image"))]
    EmptySubmission { stage: &'static str },
    #[snafu(display("Image size should be less than 5MB"))]
    ImageTooLarge { stage: &'static str, size_bytes: u64 },
    #[snafu(display("{} is not an image ({mime_type})", path.display()))]
    UnsupportedImageType {
        stage: &'static str,
        path: PathBuf,
        mime_type: String,
    },
    #[snafu(display("Could not read image {}: {source}", path.display()))]
    ReadImage {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Voice input is not available on this device"))]
    DictationUnavailable { stage: &'static str },
    #[snafu(display("Voice input failed: {source}"))]
    DictationFailed {
        stage: &'static str,
        source: DictationError,
    },
    #[snafu(display("chat id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: uuid::Error,
    },
}

pub type ChatResult<T> = Result<T, ChatError>;
