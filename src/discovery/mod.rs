//! Turns input roots into an ordered list of work items.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::DiscoveryConfig;
use crate::pipeline::WorkItem;

/// Extensions skipped by default: artifacts of earlier runs and jar archives.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &["md5", "gpg", "jar"];

#[derive(Debug, Clone)]
pub struct FileDiscovery {
    excluded_extensions: Vec<String>,
    skip_hidden: bool,
    follow_symlinks: bool,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self {
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            skip_hidden: true,
            follow_symlinks: false,
        }
    }
}

impl FileDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            excluded_extensions: config
                .excluded_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            skip_hidden: config.skip_hidden,
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Walk every root in order and return one work item per accepted file.
    ///
    /// Without `output_root` artifacts go next to each file. With it, the
    /// directory layout below each root is mirrored under `output_root`.
    pub fn discover(&self, roots: &[PathBuf], output_root: Option<&Path>) -> Vec<WorkItem> {
        let mut items = Vec::new();

        for root in roots {
            let before = items.len();
            self.walk_root(root, output_root, &mut items);
            tracing::debug!(
                "Discovered {} files under {}",
                items.len() - before,
                root.display()
            );
        }

        items
    }

    fn walk_root(&self, root: &Path, output_root: Option<&Path>, items: &mut Vec<WorkItem>) {
        let mut builder = WalkBuilder::new(root);
        // Only our own filters apply; .gitignore and friends are irrelevant here
        builder
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name(|a, b| a.cmp(b));

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Walk error under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if self.is_excluded(path) {
                continue;
            }

            let output_directory = match output_root {
                Some(output_root) => mirrored_directory(root, path, output_root),
                None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            items.push(WorkItem::new(path, output_directory));
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        if self.skip_hidden && file_name.starts_with('.') {
            tracing::warn!("Skipping hidden file {}", path.display());
            return true;
        }

        let excluded = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.excluded_extensions.iter().any(|denied| *denied == ext));
        if excluded {
            tracing::warn!("Skipping excluded file {}", path.display());
        }
        excluded
    }
}

/// `output_root / (parent of file relative to root)`; a file root maps to `output_root`.
fn mirrored_directory(root: &Path, file: &Path, output_root: &Path) -> PathBuf {
    let relative_parent = file
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .unwrap_or_else(|| Path::new(""));
    output_root.join(relative_parent)
}
