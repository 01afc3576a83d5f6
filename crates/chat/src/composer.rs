use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::BoxFuture;
use snafu::{ResultExt, Snafu, ensure};

use crate::error::{
    ChatResult, EmptySubmissionSnafu, ImageTooLargeSnafu, ReadImageSnafu,
    UnsupportedImageTypeSnafu,
};
use crate::message::IMAGE_ONLY_QUESTION;

/// Upper bound for a staged photo, in raw bytes.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// A photo accepted by the composer, already encoded as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    data_uri: String,
    mime_type: String,
    size_bytes: u64,
}

impl StagedImage {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> ChatResult<Self> {
        let size_bytes = bytes.len() as u64;
        ensure!(
            size_bytes <= MAX_IMAGE_BYTES,
            ImageTooLargeSnafu {
                stage: "stage-image-bytes",
                size_bytes,
            }
        );

        let mime_type = mime_type.trim().to_ascii_lowercase();
        ensure!(
            mime_type.starts_with("image/"),
            UnsupportedImageTypeSnafu {
                stage: "stage-image-bytes",
                path: "<memory>",
                mime_type: mime_type.clone(),
            }
        );

        Ok(Self {
            data_uri: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
            mime_type,
            size_bytes,
        })
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn into_data_uri(self) -> String {
        self.data_uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Reads a photo from disk for staging.
///
/// Oversized files are refused from their metadata, before any bytes are read.
pub async fn load_image(path: impl AsRef<Path>) -> ChatResult<StagedImage> {
    let path = path.as_ref();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    ensure!(
        mime.type_() == mime_guess::mime::IMAGE,
        UnsupportedImageTypeSnafu {
            stage: "guess-image-type",
            path: path.to_path_buf(),
            mime_type: mime.essence_str(),
        }
    );

    let metadata = tokio::fs::metadata(path).await.context(ReadImageSnafu {
        stage: "read-image-metadata",
        path: path.to_path_buf(),
    })?;
    ensure!(
        metadata.len() <= MAX_IMAGE_BYTES,
        ImageTooLargeSnafu {
            stage: "check-image-file-size",
            size_bytes: metadata.len(),
        }
    );

    let bytes = tokio::fs::read(path).await.context(ReadImageSnafu {
        stage: "read-image-bytes",
        path: path.to_path_buf(),
    })?;

    StagedImage::from_bytes(&bytes, mime.essence_str())
}

#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct DictationError {
    pub message: String,
}

impl DictationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Speech-to-text backend producing one final transcript per call.
pub trait SpeechRecognizer: Send + Sync {
    fn recognize(&self) -> BoxFuture<'static, Result<String, DictationError>>;
}

/// Composer contents taken at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub image: Option<StagedImage>,
}

impl Draft {
    /// Question text sent upstream and shown in the transcript.
    pub fn question(&self) -> String {
        if self.text.trim().is_empty() {
            IMAGE_ONLY_QUESTION.to_string()
        } else {
            self.text.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    staged_image: Option<StagedImage>,
    listening: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.staged_image.as_ref()
    }

    /// Stages `image`, replacing any earlier one.
    pub fn stage_image(&mut self, image: StagedImage) {
        self.staged_image = Some(image);
    }

    pub fn clear_image(&mut self) {
        self.staged_image = None;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Returns whether the flag actually changed.
    pub fn set_listening(&mut self, listening: bool) -> bool {
        let changed = self.listening != listening;
        self.listening = listening;
        changed
    }

    /// Appends dictated speech to whatever is already typed.
    pub fn append_transcript(&mut self, transcript: &str) {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return;
        }

        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
        self.text.push_str(transcript);
    }

    pub fn is_submittable(&self) -> bool {
        !self.text.trim().is_empty() || self.staged_image.is_some()
    }

    /// Takes text and image out of the composer, leaving it empty.
    ///
    /// Fails without touching any state when there is nothing to submit.
    pub fn take_draft(&mut self) -> ChatResult<Draft> {
        ensure!(
            self.is_submittable(),
            EmptySubmissionSnafu {
                stage: "take-draft",
            }
        );

        Ok(Draft {
            text: std::mem::take(&mut self.text),
            image: self.staged_image.take(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::ChatError;

    #[test]
    fn from_bytes_builds_data_uri() {
        let image = StagedImage::from_bytes(b"\x89PNG", "image/png").unwrap();

        assert_eq!(image.data_uri(), "data:image/png;base64,iVBORw==");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.size_bytes(), 4);
    }

    #[test]
    fn from_bytes_enforces_size_cap_and_image_type() {
        let at_limit = vec![0_u8; MAX_IMAGE_BYTES as usize];
        assert!(StagedImage::from_bytes(&at_limit, "image/jpeg").is_ok());

        let too_big = vec![0_u8; MAX_IMAGE_BYTES as usize + 1];
        assert!(matches!(
            StagedImage::from_bytes(&too_big, "image/jpeg"),
            Err(ChatError::ImageTooLarge { .. })
        ));

        assert!(matches!(
            StagedImage::from_bytes(b"plain", "text/plain"),
            Err(ChatError::UnsupportedImageType { .. })
        ));
    }

    #[tokio::test]
    async fn load_image_reads_small_file() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"jpeg-bytes").unwrap();

        let image = load_image(file.path()).await.unwrap();

        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(image.data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn load_image_refuses_oversized_file_from_metadata() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.as_file().set_len(MAX_IMAGE_BYTES + 1).unwrap();

        let error = load_image(file.path()).await.unwrap_err();

        assert!(matches!(error, ChatError::ImageTooLarge { .. }));
        assert_eq!(error.to_string(), "Image size should be less than 5MB");
    }

    #[tokio::test]
    async fn load_image_refuses_non_images_and_missing_files() {
        let text_file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(
            load_image(text_file.path()).await,
            Err(ChatError::UnsupportedImageType { .. })
        ));

        let directory = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_image(directory.path().join("missing.png")).await,
            Err(ChatError::ReadImage { .. })
        ));
    }

    #[test]
    fn transcript_is_appended_not_replaced() {
        let mut composer = Composer::new();
        composer.set_text("My maize has");
        composer.append_transcript("  brown spots on the leaves ");
        assert_eq!(composer.text(), "My maize has brown spots on the leaves");

        composer.set_text("Trailing space ");
        composer.append_transcript("kept");
        assert_eq!(composer.text(), "Trailing space kept");

        composer.set_text("");
        composer.append_transcript("fresh start");
        assert_eq!(composer.text(), "fresh start");

        composer.append_transcript("   ");
        assert_eq!(composer.text(), "fresh start");
    }

    #[test]
    fn empty_draft_is_refused_without_side_effects() {
        let mut composer = Composer::new();
        composer.set_text("   \n");

        assert!(matches!(
            composer.take_draft(),
            Err(ChatError::EmptySubmission { .. })
        ));
        assert_eq!(composer.text(), "   \n");
    }

    #[test]
    fn image_only_draft_uses_default_question() {
        let mut composer = Composer::new();
        composer.stage_image(StagedImage::from_bytes(b"img", "image/png").unwrap());

        let draft = composer.take_draft().unwrap();

        assert_eq!(draft.question(), IMAGE_ONLY_QUESTION);
        assert!(draft.image.is_some());
        assert!(composer.staged_image().is_none());
        assert_eq!(composer.text(), "");
    }
}
