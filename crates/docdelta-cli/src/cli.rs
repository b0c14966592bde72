use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docdelta_types::Dialect;

#[derive(Parser)]
#[command(
    name = "docdelta",
    about = "docdelta: compile document edits into minimal update operators",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with default dialect and builder options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a mutation script against a document and print the update
    Compile(CompileArgs),
    /// Apply an operator document to a document and print the result
    Apply(ApplyArgs),
    /// Run the recipe walkthrough against an in-memory backend
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct CompileArgs {
    /// JSON document to start from
    #[arg(short, long)]
    pub document: PathBuf,
    /// JSON array of mutations
    #[arg(short, long)]
    pub mutations: PathBuf,
    /// Treat the document as not yet persisted
    #[arg(long)]
    pub new: bool,
    /// Operator naming: canonical or mongo (overrides the config file)
    #[arg(long, value_parser = parse_dialect)]
    pub dialect: Option<Dialect>,
    /// Also print a line diff of the document
    #[arg(long)]
    pub show_diff: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// JSON document to update
    #[arg(short, long)]
    pub document: PathBuf,
    /// JSON operator document in canonical form
    #[arg(short, long)]
    pub update: PathBuf,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Operator naming: canonical or mongo (overrides the config file)
    #[arg(long, value_parser = parse_dialect)]
    pub dialect: Option<Dialect>,
}

fn parse_dialect(s: &str) -> Result<Dialect, String> {
    s.parse()
}
