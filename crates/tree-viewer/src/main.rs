//! Print a directory as a flat, indented list of its visible rows
//!
//! Usage:
//!   tree-viewer [path] [--depth N] [--all] [--hidden]
//!
//! If no path is provided, uses the current directory. Set `RUST_LOG=debug`
//! to see loads as they happen.

use anyhow::Context;
use clap::Parser;
use flat_tree::TreeError;
use futures::executor::block_on;
use tree_viewer::{expand, render, summary, Config};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::parse();
    log::info!("loading {}", config.path.display());

    let tree = config
        .open()
        .with_context(|| format!("error loading directory {}", config.path.display()))?;
    block_on(expand(&tree, &config))
        .map_err(TreeError::into_anyhow)
        .context("error loading tree")?;

    print!("{}", render(&tree));
    println!();
    println!("{}", summary(&tree));
    Ok(())
}
