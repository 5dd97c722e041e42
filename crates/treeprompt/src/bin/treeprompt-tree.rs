//! treeprompt-tree: save a directory tree as a fenced Markdown block.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use treeprompt::output::TREE_FILE_NAME;
use treeprompt::tree::{render_tree, save_tree};

#[derive(Debug, Parser)]
#[command(
    name = "treeprompt-tree",
    about = "Write a directory tree to a Markdown file",
    version
)]
struct Cli {
    /// Directory to render.
    directory: PathBuf,

    /// Output file.
    #[arg(short, long, default_value = TREE_FILE_NAME)]
    output: PathBuf,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    if !cli.directory.is_dir() {
        eprintln!(
            "error: the directory {} does not exist",
            cli.directory.display()
        );
        std::process::exit(exitcode::NOINPUT);
    }

    let lines = match render_tree(&cli.directory) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", cli.directory.display());
            std::process::exit(exitcode::NOINPUT);
        }
    };

    if let Err(e) = save_tree(&lines, &cli.output) {
        eprintln!("error: cannot write {}: {e}", cli.output.display());
        std::process::exit(exitcode::IOERR);
    }
    println!("Tree structure saved to {}", cli.output.display());
}
