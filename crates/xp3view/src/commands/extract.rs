use clap::Args;
use itertools::Itertools;
use miette::{miette, Result};
use std::{num::NonZeroUsize, path::PathBuf};
use tracing::{error, info};

use crate::worker::{self, ExtractOptions};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input XP3 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Members to extract, every member when omitted
    #[arg(short, long, value_name = "NAME")]
    member: Vec<String>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Number of worker threads, defaults to the available parallelism
    #[arg(short, long, value_name = "N")]
    jobs: Option<NonZeroUsize>,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let xp3 = super::open_archive(&self.file)?;

        let names: Vec<String> = if self.member.is_empty() {
            xp3.list_members().into_iter().map(String::from).collect()
        } else {
            if let Some(missing) = self.member.iter().find(|m| xp3.entry(m).is_none()) {
                return Err(miette!("{missing} is not in {}", self.file.display()));
            }
            self.member.iter().unique().cloned().collect()
        };

        let jobs = self
            .jobs
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);

        let options = ExtractOptions {
            directory: &self.directory,
            overwrite: self.overwrite,
            jobs,
        };
        let total = names.len();
        let summary = worker::extract_members(&xp3, names, &options);

        if summary.failed.is_empty() {
            info!("extracted {} members to {}", summary.extracted, self.directory.display());
            return Ok(());
        }

        for (name, report) in &summary.failed {
            error!("{name}: {report:?}");
        }
        Err(miette!("{} of {} members failed to extract", summary.failed.len(), total))
    }
}
