//! Output artifacts served for download.

use crate::{Result, SlidesmithError};
use std::io::ErrorKind;
use std::path::Path;

/// MIME type of a PowerPoint Open XML document.
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// A finished deck ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File contents, exactly as produced.
    pub bytes: Vec<u8>,

    /// Filename offered to the user.
    pub download_name: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, download_name: impl Into<String>) -> Self {
        Self {
            bytes,
            download_name: download_name.into(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        PPTX_MIME
    }

    /// Value for a `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        let name: String = self
            .download_name
            .chars()
            .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
            .collect();
        format!("attachment; filename=\"{}\"", name)
    }

    /// Read the artifact a program left at `path`.
    pub async fn retrieve(path: &Path, download_name: impl Into<String>) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Self::new(bytes, download_name)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SlidesmithError::ArtifactMissing(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
