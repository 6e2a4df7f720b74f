use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jarinject_format::{resolve::RELEASE, LOADER_MAIN_CLASS};

#[derive(Debug, Parser)]
#[command(
    name = "jarinject",
    about = "Merge a runtime dependency loader into a packaged JAR.",
    version
)]
pub struct Cli {
    /// Log each phase (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(visible_alias = "i", about = "Inject the loader and redirect the entry point")]
    Inject(InjectArgs),

    #[command(visible_aliases = ["l", "ls"], about = "List entries in an archive")]
    List(ListArgs),

    #[command(visible_alias = "m", about = "Print an archive's manifest")]
    Manifest(ManifestArgs),
}

#[derive(Debug, clap::Args)]
#[command(after_help = "\
\x1b[1m\x1b[4mExamples:\x1b[0m
  jarinject inject target/app.jar
  jarinject inject target/app.jar --runtime-version 1.0.2 --main-class com.example.App
  jarinject inject target/app.jar --loader ~/Downloads/maven-dependency-runtime.jar")]
pub struct InjectArgs {
    /// Archive to rewrite in place
    #[arg(env = "JARINJECT_TARGET")]
    pub target: PathBuf,

    /// Loader version to resolve (RELEASE, LATEST or an exact version)
    #[arg(long, env = "JARINJECT_RUNTIME_VERSION", default_value = RELEASE)]
    pub runtime_version: String,

    /// Entry point to use instead of the manifest's Main-Class
    #[arg(long, env = "JARINJECT_MAIN_CLASS")]
    pub main_class: Option<String>,

    /// Use this loader archive instead of resolving one
    #[arg(long, env = "JARINJECT_LOADER", value_name = "PATH", conflicts_with = "repository")]
    pub loader: Option<PathBuf>,

    /// Maven-layout repository to resolve the loader from [default: ~/.m2/repository]
    #[arg(long, env = "JARINJECT_REPOSITORY", value_name = "DIR")]
    pub repository: Option<PathBuf>,

    /// Loader artifact as group:name[:type]:version; overrides --runtime-version
    #[arg(long, env = "JARINJECT_LOADER_COORDINATE", value_name = "COORDINATE")]
    pub loader_coordinate: Option<String>,

    /// Class the merged archive launches
    #[arg(long, env = "JARINJECT_LOADER_MAIN_CLASS", default_value = LOADER_MAIN_CLASS)]
    pub loader_main_class: String,
}

#[derive(Debug, clap::Args)]
pub struct ListArgs {
    /// Archive to list
    pub archive: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ManifestArgs {
    /// Archive whose manifest to print
    pub archive: PathBuf,
}
