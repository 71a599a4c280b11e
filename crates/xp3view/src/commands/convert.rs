use clap::{Args, ValueEnum};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Png,
    Jpeg,
    Bmp,
    Tiff,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match ImageFormat::from_path(path).ok()? {
            ImageFormat::Png => Some(Format::Png),
            ImageFormat::Jpeg => Some(Format::Jpeg),
            ImageFormat::Bmp => Some(Format::Bmp),
            ImageFormat::Tiff => Some(Format::Tiff),
            _ => None,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Format::Png => ImageFormat::Png,
            Format::Jpeg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
            Format::Tiff => ImageFormat::Tiff,
        }
    }
}

#[derive(Args)]
pub struct ConvertArgs {
    /// An input XP3 file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The image member to convert
    #[arg(short, long, value_name = "NAME")]
    member: String,

    /// A target image file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Target format, guessed from the output extension when omitted
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ConvertArgs {
    pub fn handle(&self) -> Result<()> {
        let format = self
            .format
            .or_else(|| Format::from_path(&self.output))
            .ok_or_else(|| {
                miette!(
                    "unable to pick a format for {}, pass --format",
                    self.output.display()
                )
            })?;

        let xp3 = super::open_archive(&self.file)?;
        let data = xp3
            .extract(&self.member)
            .context(format!("extracting {}", self.member))?;
        let image = image::load_from_memory(&data)
            .into_diagnostic()
            .context(format!("{} is not a supported image", self.member))?;

        let out = if !self.overwrite {
            File::create_new(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        } else {
            File::create(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        };

        let mut writer = BufWriter::new(out);
        prepare(image, format)
            .write_to(&mut writer, format.image_format())
            .into_diagnostic()
            .context(format!("encoding {}", &self.output.display()))?;
        writer.flush().into_diagnostic()?;

        info!("converted {} to {}", self.member, self.output.display());
        Ok(())
    }
}

/// Reduce an image to a color type the target encoder accepts.
fn prepare(image: DynamicImage, format: Format) -> DynamicImage {
    match format {
        Format::Jpeg if image.color().has_alpha() => {
            DynamicImage::ImageRgb8(flatten_on_white(&image))
        }
        Format::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        Format::Bmp if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        Format::Bmp => DynamicImage::ImageRgb8(image.to_rgb8()),
        Format::Png | Format::Tiff => image,
    }
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}
