//! A data source that lists directories on the local filesystem

use anyhow::{bail, Context};
use futures::future::{self, FutureExt};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::node::Node;
use crate::options::FilesystemOptions;
use crate::registry::NodeFactory;
use crate::source::{DataSource, LoadFuture};
use crate::tree::FlatTree;

/// Metadata for filesystem nodes
#[derive(Debug, Clone)]
pub struct FileData {
    /// Entry name (last path component)
    pub name: String,
    /// Full path on the filesystem
    pub path: PathBuf,
    /// File size in bytes (0 for directories)
    pub size: u64,
    /// Last modified timestamp
    pub modified: Option<SystemTime>,
    /// File extension (if any)
    pub extension: Option<String>,
}

impl FileData {
    /// Payload for the root of a tree over `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist or isn't a directory.
    pub fn root(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
        if !metadata.is_dir() {
            bail!("{} is not a directory", path.display());
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();
        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: 0,
            modified: metadata.modified().ok(),
            extension: None,
        })
    }
}

impl std::fmt::Display for FileData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Lists a directory's entries as children
///
/// Directories become branches, everything else leaves. Reading happens
/// synchronously when the engine asks for a branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesystemSource {
    options: FilesystemOptions,
}

impl FilesystemSource {
    pub fn new(options: FilesystemOptions) -> Self {
        Self { options }
    }

    /// Open a tree over the directory at `path`
    pub fn open(self, path: impl AsRef<Path>) -> anyhow::Result<FlatTree<FileData>> {
        Ok(FlatTree::new(self, FileData::root(path)?))
    }

    fn list(&self, dir: &Path, factory: &NodeFactory) -> anyhow::Result<Vec<Node<FileData>>> {
        let entries = fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if !self.options.show_hidden && name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let metadata = entry
                .metadata()
                .with_context(|| format!("cannot stat {}", path.display()))?;
            let extension = if metadata.is_file() {
                path.extension().and_then(|e| e.to_str()).map(|s| s.to_string())
            } else {
                None
            };
            let data = FileData {
                name,
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                modified: metadata.modified().ok(),
                extension,
                path,
            };
            children.push((metadata.is_dir(), data));
        }

        // Directories first if requested, then by name
        let directories_first = self.options.directories_first;
        children.sort_by(|(a_dir, a), (b_dir, b)| match (a_dir, b_dir) {
            (true, false) if directories_first => Ordering::Less,
            (false, true) if directories_first => Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });

        Ok(children
            .into_iter()
            .map(|(is_dir, data)| {
                if is_dir {
                    factory.create_branch(data, false)
                } else {
                    factory.create_leaf(data)
                }
            })
            .collect())
    }
}

impl DataSource<FileData> for FilesystemSource {
    fn load(&self, branch: &Node<FileData>, factory: NodeFactory) -> LoadFuture<FileData> {
        future::ready(self.list(&branch.data.path, &factory)).boxed_local()
    }
}
