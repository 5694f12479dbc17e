//! Configuration options for expansion and the filesystem data source.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for [`FlatTree::expand`](crate::FlatTree::expand).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExpandOptions {
    /// Also connect every collapsed ancestor so the branch ends up on screen.
    pub ensure_visible: bool,

    /// Expand every child branch too, all the way down.
    pub recursive: bool,
}

impl ExpandOptions {
    /// Create new expand options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether collapsed ancestors should be expanded as well.
    pub fn ensure_visible(mut self, ensure_visible: bool) -> Self {
        self.ensure_visible = ensure_visible;
        self
    }

    /// Set whether the whole subtree should be expanded.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Configuration for [`FilesystemSource`](crate::FilesystemSource).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilesystemOptions {
    /// Whether entries whose name starts with `.` are listed.
    pub show_hidden: bool,

    /// List directories before files. Within each group entries are sorted
    /// by name.
    pub directories_first: bool,
}

impl Default for FilesystemOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            directories_first: true,
        }
    }
}

impl FilesystemOptions {
    /// Create new filesystem options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether hidden entries are listed.
    pub fn show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    /// Set whether directories are listed before files.
    pub fn directories_first(mut self, directories_first: bool) -> Self {
        self.directories_first = directories_first;
        self
    }
}
