//! Tree Viewer Library
//!
//! Prints a directory as the rows a virtualized list would show: a
//! [`FlatTree`] over the filesystem, expanded to some depth, rendered from its
//! visible nodes.
//!
//! # Example
//!
//! ```no_run
//! use futures::executor::block_on;
//! use tree_viewer::{expand, render, Config};
//!
//! let config = Config::from_args(["tree-viewer", "./src", "--depth", "2"].map(String::from)).unwrap();
//! let tree = config.open().unwrap();
//! block_on(expand(&tree, &config)).unwrap();
//! print!("{}", render(&tree));
//! ```

use clap::Parser;
use flat_tree::prelude::*;
use futures::future;
use log::debug;
use std::path::PathBuf;

/// Print a directory as a flat, indented list of its visible rows
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "tree-viewer")]
pub struct Config {
    /// Directory to show
    #[arg(default_value = ".")]
    pub path: PathBuf,
    /// Levels to expand below the root
    #[arg(long, default_value_t = 1)]
    pub depth: usize,
    /// Expand everything
    #[arg(long)]
    pub all: bool,
    /// Include entries starting with `.`
    #[arg(long = "hidden")]
    pub show_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            depth: 1,
            all: false,
            show_hidden: false,
        }
    }
}

impl Config {
    /// Parse `[path] [--depth N] [--all] [--hidden]`; the first item is the program name
    pub fn from_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        Ok(Config::try_parse_from(args)?)
    }

    /// Open a tree over the configured directory
    pub fn open(&self) -> anyhow::Result<FlatTree<FileData>> {
        let options = FilesystemOptions::new().show_hidden(self.show_hidden);
        FilesystemSource::new(options).open(&self.path)
    }
}

/// Expand the tree as far as the configuration asks
pub async fn expand(tree: &FlatTree<FileData>, config: &Config) -> flat_tree::Result<()> {
    if config.all {
        return tree
            .expand(tree.root(), ExpandOptions::new().recursive(true))
            .await;
    }
    if config.depth == 0 {
        return tree.ensure_loaded(tree.root()).await;
    }

    tree.expand(tree.root(), ExpandOptions::default()).await?;
    for level in 1..config.depth {
        let branches: Vec<NodeId> = tree
            .visible_nodes()
            .iter()
            .copied()
            .filter(|&id| tree.depth(id) == Some(level))
            .filter(|&id| tree.get(id).map_or(false, |node| node.is_branch()))
            .collect();
        debug!("expanding {} directories at depth {}", branches.len(), level);
        let expansions = branches
            .into_iter()
            .map(|id| tree.expand(id, ExpandOptions::default()));
        for result in future::join_all(expansions).await {
            result?;
        }
    }
    Ok(())
}

/// One line per visible node, indented by depth
pub fn render(tree: &FlatTree<FileData>) -> String {
    let mut out = String::new();
    for &id in tree.visible_nodes().iter() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let indent = "  ".repeat(tree.depth(id).unwrap_or(1).saturating_sub(1));
        let line = match node.kind() {
            NodeKind::Branch => match node.children() {
                Some(children) => format!("📁 {} ({})", node.data.name, items(children.len())),
                None => format!("📁 {}", node.data.name),
            },
            NodeKind::Leaf => format!("📄 {} ({})", node.data.name, format_size(node.data.size)),
        };
        out.push_str(&indent);
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Counts over the loaded part of the tree
pub fn summary(tree: &FlatTree<FileData>) -> String {
    let registry = tree.read();
    let files = registry.leaves();
    let total_size: u64 = files
        .iter()
        .filter_map(|&id| registry.get(id))
        .map(|node| node.data.size)
        .sum();
    format!(
        "{} visible, {} loaded ({} directories, {} files, {})",
        tree.visible_nodes().len(),
        registry.len(),
        registry.branches().len(),
        files.len(),
        format_size(total_size)
    )
}

fn items(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
