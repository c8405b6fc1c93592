//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::PipelineKind;
use crate::execution::Task;
use clap::{Parser, Subcommand};
use commands::{ConfigCommand, WatchCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Frontend asset build orchestrator
#[derive(Debug, Parser, Clone)]
#[command(name = "assetflow")]
#[command(version)]
#[command(
    about = "Builds styles, scripts, icon fonts and images, then serves and watches them",
    long_about = None
)]
pub struct Cli {
    /// Task to run; without one, build everything then serve and watch
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build in dev mode: source maps, no minification, keep intermediate files
    #[arg(long, global = true)]
    pub dev: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build every asset once, without serving or watching
    Build,

    /// Compile stylesheets
    Css,

    /// Bundle scripts
    Js,

    /// Generate the icon font and its stylesheet partial
    IconFont,

    /// Optimize changed images
    Images,

    /// Run the spec suite
    Test,

    /// Build one target, then rebuild it on every change
    Watch(WatchCommand),

    /// Serve the production directory with live reload
    Serve,

    /// Print the resolved configuration
    Config(ConfigCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// The task to execute, or `None` for commands that run no pipeline
    pub fn task(&self) -> Option<Task> {
        let task = match &self.command {
            None => Task::Default,
            Some(Command::Build) => Task::Build,
            Some(Command::Css) => Task::Run(PipelineKind::Styles),
            Some(Command::Js) => Task::Run(PipelineKind::Scripts),
            Some(Command::IconFont) => Task::Run(PipelineKind::IconFont),
            Some(Command::Images) => Task::Run(PipelineKind::Images),
            Some(Command::Test) => Task::Run(PipelineKind::Tests),
            Some(Command::Watch(cmd)) => Task::Watch(cmd.target.into()),
            Some(Command::Serve) => Task::Serve,
            Some(Command::Config(_)) => return None,
        };
        Some(task)
    }
}
