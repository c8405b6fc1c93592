//! CLI command definitions

use crate::core::PipelineKind;
use clap::Args;

/// Build a target, then rebuild it whenever its sources change
#[derive(Debug, Args, Clone)]
pub struct WatchCommand {
    /// Pipeline to watch
    #[arg(value_enum)]
    pub target: PipelineArg,
}

/// Print the resolved configuration
#[derive(Debug, Args, Clone)]
pub struct ConfigCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Pipeline argument, named after the task that runs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PipelineArg {
    Css,
    Js,
    #[clap(name = "icon-font")]
    IconFont,
    Images,
    Test,
}

impl From<PipelineArg> for PipelineKind {
    fn from(arg: PipelineArg) -> Self {
        match arg {
            PipelineArg::Css => PipelineKind::Styles,
            PipelineArg::Js => PipelineKind::Scripts,
            PipelineArg::IconFont => PipelineKind::IconFont,
            PipelineArg::Images => PipelineKind::Images,
            PipelineArg::Test => PipelineKind::Tests,
        }
    }
}
