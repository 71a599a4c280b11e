//! Background extraction workers
//!
//! Workers only read from the archive and write their own output files. Results
//! travel back over a channel to the calling thread, which owns the progress
//! counters and the failure list.

use crossbeam_channel::{unbounded, Sender};
use miette::{miette, Context, IntoDiagnostic, Report, Result};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use xp3_reader::Xp3Archive;

/// Where and how members are written
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    /// Directory receiving the members
    pub directory: &'a Path,
    /// Replace files that already exist
    pub overwrite: bool,
    /// Number of worker threads
    pub jobs: usize,
}

/// Messages sent from a worker to the thread that owns the progress state
#[derive(Debug)]
pub enum WorkerMessage {
    Extracted {
        name: String,
        path: PathBuf,
        bytes: usize,
    },
    Failed {
        name: String,
        report: Report,
    },
}

/// Outcome of a batch extraction
#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub failed: Vec<(String, Report)>,
}

/// Extract `names` from `xp3` on a pool of worker threads.
///
/// A failing member does not stop the others.
pub fn extract_members(
    xp3: &Xp3Archive,
    names: Vec<String>,
    options: &ExtractOptions<'_>,
) -> ExtractSummary {
    let total = names.len();
    let (job_sender, job_receiver) = unbounded::<String>();
    let (sender, receiver) = unbounded::<WorkerMessage>();

    for name in names {
        job_sender.send(name).ok();
    }
    drop(job_sender);

    std::thread::scope(|scope| {
        for _ in 0..options.jobs.clamp(1, total.max(1)) {
            let job_receiver = job_receiver.clone();
            let sender = sender.clone();
            scope.spawn(move || {
                for name in job_receiver {
                    if !extract_one(xp3, name, options, &sender) {
                        break;
                    }
                }
            });
        }
        drop(sender);

        let mut summary = ExtractSummary::default();
        for (done, message) in receiver.iter().enumerate() {
            match message {
                WorkerMessage::Extracted { name, path, bytes } => {
                    summary.extracted += 1;
                    debug!(%name, bytes, "extracted");
                    info!("[{}/{}] writing {}", done + 1, total, path.display());
                }
                WorkerMessage::Failed { name, report } => {
                    warn!("[{}/{}] failed {}", done + 1, total, name);
                    summary.failed.push((name, report));
                }
            }
        }
        summary
    })
}

fn extract_one(
    xp3: &Xp3Archive,
    name: String,
    options: &ExtractOptions<'_>,
    sender: &Sender<WorkerMessage>,
) -> bool {
    let message = match write_member(xp3, &name, options) {
        Ok((path, bytes)) => WorkerMessage::Extracted { name, path, bytes },
        Err(report) => WorkerMessage::Failed { name, report },
    };
    sender.send(message).is_ok()
}

fn write_member(
    xp3: &Xp3Archive,
    name: &str,
    options: &ExtractOptions<'_>,
) -> Result<(PathBuf, usize)> {
    let path = output_path(options.directory, name)?;
    let data = xp3.extract(name).context(format!("extracting {name}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .into_diagnostic()
            .context(format!("creating {}", parent.display()))?;
    }

    let mut out = if !options.overwrite {
        File::create_new(&path)
            .into_diagnostic()
            .context(format!("creating {}", &path.display()))?
    } else {
        File::create(&path)
            .into_diagnostic()
            .context(format!("creating {}", &path.display()))?
    };
    out.write_all(&data)
        .into_diagnostic()
        .context(format!("writing {}", &path.display()))?;

    Ok((path, data.len()))
}

/// Map a member name to a path below `directory`.
///
/// Member names come from the archive, so names that are absolute or climb out
/// of `directory` are refused.
pub fn output_path(directory: &Path, name: &str) -> Result<PathBuf> {
    if name.starts_with(['/', '\\']) {
        return Err(miette!("refusing to extract absolute member name {name}"));
    }

    let mut path = directory.to_path_buf();
    let mut depth = 0usize;
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(miette!("refusing to extract {name} outside of the target"));
            }
            c if c.contains(':') => {
                return Err(miette!("refusing to extract member name {name}"));
            }
            c => {
                path.push(c);
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return Err(miette!("member name {name:?} does not name a file"));
    }
    Ok(path)
}
