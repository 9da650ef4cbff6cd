//! Image Source Enumerator
//!
//! Walks an image-root directory and treats each immediate subdirectory as a
//! class label. Group order is the directory listing order, NOT sorted: the
//! label-to-index mapping for the whole run derives from this order, and the
//! same mapping is persisted alongside the trained classifier.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{PipelineError, Result};

/// One directory's worth of images sharing a class label.
///
/// Immutable after creation for the duration of one run; the group's position
/// in the enumeration result is its label index.
#[derive(Debug, Clone)]
pub struct LabelGroup {
    /// Class label (the subdirectory name)
    pub label: String,
    /// Image files in listing order
    pub image_files: Vec<PathBuf>,
}

impl LabelGroup {
    /// Number of images in this group.
    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    /// Check if the group has no images.
    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }
}

/// Enumerate labeled image sources under `root`.
///
/// Each immediate subdirectory of `root` becomes one [`LabelGroup`]. Files are
/// collected from the label directory itself and from one nested level below
/// it (so augmented copies written to e.g. `<label>/flipped/` are included).
/// Labels listed in `skip_labels` are filtered out case-insensitively.
///
/// Fails with [`PipelineError::NotFound`] if `root` does not exist. An empty
/// result (zero subdirectories) is valid; downstream components reject empty
/// datasets explicitly.
pub fn scan_image_sources<P: AsRef<Path>>(root: P, skip_labels: &[String]) -> Result<Vec<LabelGroup>> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(PipelineError::NotFound(root.to_path_buf()));
    }

    let skip_lower: Vec<String> = skip_labels.iter().map(|s| s.to_lowercase()).collect();

    let mut groups = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let label = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if skip_lower.contains(&label.to_lowercase()) {
            debug!("Skipping label directory '{}'", label);
            continue;
        }

        let image_files = list_images(&entry.path());
        debug!("Label '{}': {} images", label, image_files.len());
        groups.push(LabelGroup { label, image_files });
    }

    info!(
        "Found {} label directories under {:?}",
        groups.len(),
        root
    );
    Ok(groups)
}

/// List image files directly inside `dir` and one level below it.
fn list_images(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| super::is_image_file(p))
        .collect()
}

/// Total image count across all groups.
pub fn total_images(groups: &[LabelGroup]) -> usize {
    groups.iter().map(|g| g.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    fn make_tree(root: &Path) {
        for (label, count) in [("cat", 3), ("dog", 2)] {
            let dir = root.join(label);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..count {
                touch(&dir.join(format!("{}_{}.jpg", label, i)));
            }
        }
        // Non-image files must be ignored
        touch(&root.join("cat").join("notes.txt"));
        // Loose files at the root are not label directories
        touch(&root.join("stray.jpg"));
    }

    #[test]
    fn test_scan_groups_and_counts() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let groups = scan_image_sources(tmp.path(), &[]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(total_images(&groups), 5);

        let cat = groups.iter().find(|g| g.label == "cat").unwrap();
        assert_eq!(cat.len(), 3);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let first: Vec<String> = scan_image_sources(tmp.path(), &[])
            .unwrap()
            .into_iter()
            .map(|g| g.label)
            .collect();
        let second: Vec<String> = scan_image_sources(tmp.path(), &[])
            .unwrap()
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_skip_list_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());

        let groups = scan_image_sources(tmp.path(), &["CAT".to_string()]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "dog");
    }

    #[test]
    fn test_nested_subdirectory_included() {
        let tmp = tempfile::tempdir().unwrap();
        make_tree(tmp.path());
        let flipped = tmp.path().join("cat").join("flipped");
        fs::create_dir_all(&flipped).unwrap();
        touch(&flipped.join("cat_0_m_x.jpg"));

        let groups = scan_image_sources(tmp.path(), &[]).unwrap();
        let cat = groups.iter().find(|g| g.label == "cat").unwrap();
        assert_eq!(cat.len(), 4);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let err = scan_image_sources("/definitely/not/here", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn test_empty_root_is_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let groups = scan_image_sources(tmp.path(), &[]).unwrap();
        assert!(groups.is_empty());
    }
}
