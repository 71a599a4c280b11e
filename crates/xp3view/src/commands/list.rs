use clap::Args;
use miette::Result;
use owo_colors::{OwoColorize, Stream};
use std::path::PathBuf;
use xp3_reader::MemberEntry;

#[derive(Args)]
pub struct ListArgs {
    /// An input XP3 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Show sizes, compression and segment counts
    #[arg(short, long, default_value_t = false)]
    long: bool,

    /// Keep the order of the archive index instead of sorting by name
    #[arg(long, default_value_t = false)]
    index_order: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let xp3 = super::open_archive(&self.file)?;

        let members: Vec<(&str, &MemberEntry)> = if self.index_order {
            xp3.catalog().into_iter().flat_map(|c| c.iter()).collect()
        } else {
            xp3.list_members()
                .into_iter()
                .filter_map(|name| Some((name, xp3.entry(name)?)))
                .collect()
        };

        for (name, entry) in members {
            if !self.long {
                println!("{name}");
                continue;
            }

            let method = if entry.is_compressed() { "zlib" } else { "stored" };
            println!(
                "{:>12} {:>12} {:<6} {:>3} {}",
                entry.stored_size(),
                entry.uncompressed_size,
                method,
                entry.segments.len(),
                name.if_supports_color(Stream::Stdout, |n| n.bold()),
            );
        }

        if self.long {
            println!(
                "{}: {} members, {} bytes",
                xp3.path().display(),
                xp3.len(),
                xp3.decompressed_size()
            );
        }

        Ok(())
    }
}
