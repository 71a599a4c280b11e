use std::path::Path;

use miette::{Context, Result};
use xp3_reader::Xp3Archive;

pub mod convert;
pub mod extract;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// List the members of an XP3 file
    List(list::ListArgs),
    /// Extract members of an XP3 file into a directory
    Extract(extract::ExtractArgs),
    /// Convert an image stored in an XP3 file
    Convert(convert::ConvertArgs),
    /// Describe a single member of an XP3 file
    Info(info::InfoArgs),
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::List(list) => list.handle(),
            Commands::Extract(extract) => extract.handle(),
            Commands::Convert(convert) => convert.handle(),
            Commands::Info(info) => info.handle(),
        }
    }
}

pub(crate) fn open_archive(path: &Path) -> Result<Xp3Archive> {
    Xp3Archive::open(path).context(format!("path: {}", path.display()))
}
