//! Request-scoped scratch directories.

use crate::prompt::{OUTPUT_FILE, SCRIPT_FILE};
use crate::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// A temporary directory owned by one generation request.
///
/// The synthesized program and the output artifact live here, so concurrent
/// requests never share paths. The directory is removed on drop.
#[derive(Debug)]
pub struct RequestWorkspace {
    id: Uuid,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create a workspace under `base`, or under the system temp dir.
    pub fn create(id: Uuid, base: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        let prefix = format!("slidesmith-{}-", id.simple());
        builder.prefix(&prefix);

        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base)?;
                builder.tempdir_in(base)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the synthesized program is written.
    pub fn script_path(&self) -> PathBuf {
        self.dir.path().join(SCRIPT_FILE)
    }

    /// Where the program is expected to save the deck.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspaces_are_isolated_and_removed() {
        let base = tempfile::tempdir().unwrap();
        let a = RequestWorkspace::create(Uuid::new_v4(), Some(base.path())).unwrap();
        let b = RequestWorkspace::create(Uuid::new_v4(), Some(base.path())).unwrap();

        assert_ne!(a.output_path(), b.output_path());
        assert!(a.script_path().ends_with("generated_deck.py"));
        assert!(a.output_path().ends_with("output.pptx"));

        let path = a.path().to_path_buf();
        assert!(path.is_dir());
        drop(a);
        assert!(!path.exists());
    }
}
