use std::path::{Path, PathBuf};

/// Maps a client-supplied image reference to an existing file.
///
/// Absolute paths are taken as-is when they exist. Relative references are
/// probed against the ordered candidate roots; the first hit wins. When
/// nothing matches, resolution fails closed rather than guessing.
pub fn resolve_image(reference: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let path = Path::new(reference);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    roots
        .iter()
        .map(|root| root.join(path))
        .find(|candidate| candidate.is_file())
}
