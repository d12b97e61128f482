use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

mod dispatch;
mod render;
mod report;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "mergedeploy")]
#[command(
    about = "Merge resolved dependency packages into one build/host deploy tree",
    long_about = None
)]
struct Cli {
    #[arg(long, value_enum, default_value_t = StyleArg::Auto, global = true)]
    style: StyleArg,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StyleArg {
    Auto,
    Plain,
    Rich,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy every dependency package into <output-folder>/merged_deploy.
    Deploy(DeployArgs),
    /// Show what a deploy would copy or skip without touching the filesystem.
    Plan {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long, default_value = ".")]
        output_folder: PathBuf,
    },
    /// Print the content digest of a directory tree.
    Digest { path: PathBuf },
    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Dependency graph document (TOML, or JSON with a .json extension).
    #[arg(long)]
    graph: PathBuf,
    #[arg(long, default_value = ".")]
    output_folder: PathBuf,
    /// Conf override, e.g. -c tools.deployer:symlinks=False.
    #[arg(short = 'c', long = "conf", value_name = "KEY=VALUE")]
    conf: Vec<String>,
    #[arg(long)]
    conf_file: Option<PathBuf>,
    /// Write a JSON deploy report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dispatch::run_cli(cli)
}

#[cfg(test)]
mod tests;
