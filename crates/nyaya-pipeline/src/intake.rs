//! Evidence intake: file validation and per-modality text extraction.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use nyaya_ai::{Generator, LlmError, MediaInput};
use nyaya_core::evidence::{ExtractionError, FileMetadata, Modality, file_type_for};

const HASH_BUF_BYTES: usize = 8192;

pub const IMAGE_INSTRUCTION: &str =
    "Extract all text visible in this image verbatim, then briefly describe anything else relevant.";
pub const AUDIO_INSTRUCTION: &str = "Transcribe this audio file verbatim.";
pub const VIDEO_INSTRUCTION: &str =
    "Transcribe the audio and describe the visual events in this video.";

/// Validate an evidence file and record its size, type, and SHA-256.
pub fn validate_file(path: &Path) -> FileMetadata {
    let Ok(meta) = std::fs::metadata(path) else {
        return FileMetadata::missing(path);
    };
    if !meta.is_file() {
        return FileMetadata::missing(path);
    }
    let file_hash = match sha256_file(path) {
        Ok(hash) => hash,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "hashing failed");
            format!("error: {e}")
        }
    };
    FileMetadata {
        valid: true,
        file_path: path.display().to_string(),
        error: None,
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        file_type: Some(file_type_for(path).to_string()),
        file_size_bytes: Some(meta.len()),
        file_hash: Some(file_hash),
        timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
    }
}

/// Streaming SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_BUF_BYTES];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Extract the text content of one evidence file.
///
/// Documents are read as UTF-8 (invalid bytes replaced). PDFs need the `pdf`
/// feature. Images, audio, and video are sent to the generator for
/// transcription.
pub async fn extract_text(
    generator: &dyn Generator,
    modality: Modality,
    path: &Path,
) -> Result<String, ExtractionError> {
    let text = match modality {
        Modality::Document => read_document(path).await?,
        Modality::Pdf => read_pdf(path).await?,
        Modality::Image => transcribe(generator, modality, path, IMAGE_INSTRUCTION).await?,
        Modality::Audio => transcribe(generator, modality, path, AUDIO_INSTRUCTION).await?,
        Modality::Video => transcribe(generator, modality, path, VIDEO_INSTRUCTION).await?,
    };
    debug!(path = %path.display(), ?modality, chars = text.len(), "extracted text");
    Ok(text)
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ExtractionError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

async fn read_document(path: &Path) -> Result<String, ExtractionError> {
    let bytes = read_bytes(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: &Path) -> Result<String, ExtractionError> {
    let bytes = read_bytes(path).await?;
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::Failed {
            modality: Modality::Pdf,
            message: e.to_string(),
        })?
        .map_err(|e| ExtractionError::Failed {
            modality: Modality::Pdf,
            message: e.to_string(),
        })
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(_path: &Path) -> Result<String, ExtractionError> {
    Err(ExtractionError::Unavailable(
        "PDF extraction requires the `pdf` feature".to_string(),
    ))
}

async fn transcribe(
    generator: &dyn Generator,
    modality: Modality,
    path: &Path,
    instruction: &str,
) -> Result<String, ExtractionError> {
    let data = read_bytes(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media = MediaInput::new(file_name, data);
    generator
        .transcribe(&media, instruction)
        .await
        .map_err(|e| match e {
            LlmError::Unsupported(what) => {
                ExtractionError::Unavailable(format!("{what} is not available"))
            }
            other => ExtractionError::Failed {
                modality,
                message: other.to_string(),
            },
        })
}
