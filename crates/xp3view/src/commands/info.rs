use clap::Args;
use itertools::Itertools;
use miette::{miette, Context, Result};
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input XP3 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The member to describe
    #[arg(short, long, value_name = "NAME")]
    member: String,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let xp3 = super::open_archive(&self.file)?;
        let entry = xp3
            .entry(&self.member)
            .ok_or_else(|| miette!("{} is not in {}", self.member, self.file.display()))?;

        let data = xp3
            .extract(&self.member)
            .context(format!("extracting {}", self.member))?;

        println!("name:        {}", self.member);
        println!("compression: {:?}", entry.compression);
        println!("declared:    {} bytes", entry.uncompressed_size);
        println!("stored:      {} bytes", entry.stored_size());
        println!("extracted:   {} bytes", data.len());
        println!(
            "segments:    {}",
            entry
                .segments
                .iter()
                .map(|s| format!("{}+{}", s.offset, s.length))
                .join(", ")
        );
        match image::guess_format(&data) {
            Ok(format) => println!("image:       {format:?}"),
            Err(_) => println!("image:       none"),
        }

        Ok(())
    }
}
