use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::generation::ImageArtifact;

/// Persists generated images under a fixed directory and hands back stable,
/// directory-relative references.
pub struct ArtifactStore {
    dir: PathBuf,
    public_prefix: String,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf, public_prefix: String) -> Self {
        ArtifactStore { dir, public_prefix }
    }

    pub fn save_png(&self, image: &RgbImage) -> Result<ImageArtifact> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("could not create artifacts dir {}", self.dir.display()))?;

        let (storage_path, filename) = self.claim_filename()?;
        if let Err(err) = image.save_with_format(&storage_path, ImageFormat::Png) {
            // a failed write must not leave the zero-byte reservation behind
            let _ = fs::remove_file(&storage_path);
            return Err(err)
                .with_context(|| format!("could not write {}", storage_path.display()));
        }
        debug!(path = %storage_path.display(), "Generated image persisted");

        Ok(ImageArtifact {
            public_reference: format!("{}/{}", self.public_prefix, filename),
            storage_path,
        })
    }

    /// Millisecond timestamp names, with a sequence suffix when a burst of
    /// requests lands on the same millisecond. `create_new` reserves the name
    /// atomically so two callers can never claim the same file.
    fn claim_filename(&self) -> Result<(PathBuf, String)> {
        let timestamp = Utc::now().timestamp_millis();
        for sequence in 0..1000u32 {
            let filename = if sequence == 0 {
                format!("generated_{timestamp}.png")
            } else {
                format!("generated_{timestamp}_{sequence}.png")
            };
            let path = self.dir.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok((path, filename)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("could not reserve {}", path.display()))
                }
            }
        }
        anyhow::bail!("exhausted artifact name candidates for timestamp {timestamp}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> RgbImage {
        RgbImage::from_fn(16, 16, |x, y| image::Rgb([x as u8 * 8, y as u8 * 8, 64]))
    }

    fn filename_matches_pattern(name: &str) -> bool {
        let Some(stem) = name.strip_prefix("generated_").and_then(|n| n.strip_suffix(".png"))
        else {
            return false;
        };
        stem.chars().all(|c| c.is_ascii_digit() || c == '_')
            && stem.chars().next().is_some_and(|c| c.is_ascii_digit())
    }

    #[test]
    fn saves_under_artifacts_dir_with_public_reference() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("uploads"), "uploads".to_string());

        let artifact = store.save_png(&sample_image()).unwrap();
        assert!(artifact.storage_path.is_file());
        assert!(artifact.public_reference.starts_with("uploads/generated_"));
        assert!(artifact.public_reference.ends_with(".png"));

        let filename = artifact.public_reference.rsplit('/').next().unwrap();
        assert!(filename_matches_pattern(filename));
    }

    #[test]
    fn rapid_saves_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf(), "uploads".to_string());

        let first = store.save_png(&sample_image()).unwrap();
        let second = store.save_png(&sample_image()).unwrap();
        let third = store.save_png(&sample_image()).unwrap();

        assert_ne!(first.public_reference, second.public_reference);
        assert_ne!(second.public_reference, third.public_reference);
        assert!(first.storage_path.is_file());
        assert!(second.storage_path.is_file());
        assert!(third.storage_path.is_file());
    }

    #[test]
    fn directory_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested").join("uploads"), "uploads".into());
        store.save_png(&sample_image()).unwrap();
        store.save_png(&sample_image()).unwrap();
    }

    #[test]
    fn failed_write_removes_the_reserved_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().to_path_buf(), "uploads".to_string());

        // zero-sized images cannot be PNG-encoded
        let err = store.save_png(&RgbImage::new(0, 0)).unwrap_err();
        assert!(err.to_string().contains("could not write"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn save_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("uploads");
        std::fs::write(&blocked, b"not a directory").unwrap();

        let store = ArtifactStore::new(blocked, "uploads".to_string());
        assert!(store.save_png(&sample_image()).is_err());
    }
}
