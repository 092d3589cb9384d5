use argh::FromArgs;
use image::{imageops::FilterType, RgbImage};
use nadeshiko::{
    decode::decode_to_canvases, encode::DEFAULT_BUDGET, DitherMatrix, EncodeOptions, Encoder,
    Palette,
};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Nadeshiko cell-display stream encoder and decoder.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
}

/// Encodes a sequence of images into a command stream.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// dither matrix (none, 2x2, 4x4), defaults to 2x2
    #[argh(option, default = "Dither::Bayer2")]
    dither: Dither,

    /// cost budget of every frame after the first
    #[argh(option, default = "DEFAULT_BUDGET")]
    budget: u32,

    /// stream width in cells
    #[argh(option, default = "160")]
    width: u8,

    /// stream height in cells
    #[argh(option, default = "50")]
    height: u8,

    /// the output file
    #[argh(option, short = 'o')]
    output: String,

    /// input images, or directories of images encoded in file name order
    #[argh(positional)]
    inputs: Vec<String>,
}

/// Decodes a command stream into one PNG per frame.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// the input stream
    #[argh(positional)]
    input: String,
    /// the directory the frames are written to
    #[argh(positional)]
    output: String,
}

#[derive(Debug, Clone, Copy)]
enum Dither {
    None,
    Bayer2,
    Bayer4,
}

impl FromStr for Dither {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(dither) = s.eq_ignore_ascii_case("none").then_some(Dither::None)
               .or_else(|| (s == "2x2").then_some(Dither::Bayer2))
               .or_else(|| (s == "4x4").then_some(Dither::Bayer4))
        else { return Err("expected none, 2x2 or 4x4"); };

        Ok(dither)
    }
}

impl From<Dither> for DitherMatrix {
    fn from(dither: Dither) -> Self {
        match dither {
            Dither::None => DitherMatrix::none(),
            Dither::Bayer2 => DitherMatrix::bayer2(),
            Dither::Bayer4 => DitherMatrix::bayer4(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
    }
}

/// Expands directories into their entries, sorted by name.
fn collect_inputs(inputs: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if !path.is_dir() {
            paths.push(path.to_owned());
            continue;
        }

        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.retain(|p| p.is_file());
        entries.sort();
        paths.extend(entries);
    }
    Ok(paths)
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        dither,
        budget,
        width,
        height,
        output,
        inputs,
    } = options;

    if width == 0 || height == 0 {
        return Err("stream dimensions must not be zero".into());
    }

    let paths = collect_inputs(&inputs)?;
    if paths.is_empty() {
        return Err("no input images".into());
    }

    let (pixel_width, pixel_height) = (u32::from(width) * 2, u32::from(height) * 4);
    println!(
        "Encoding {} frames as {width}x{height} cells ({pixel_width}x{pixel_height} pixels)",
        paths.len()
    );

    let mut encoder = Encoder::new(EncodeOptions {
        budget,
        dither: dither.into(),
    });

    for path in &paths {
        let image = image::io::Reader::open(path)?
            .with_guessed_format()?
            .decode()?
            .resize_exact(pixel_width, pixel_height, FilterType::Triangle);

        let pixels = image.into_rgb8().pixels().map(|p| p.0).collect::<Vec<_>>();
        let stats = encoder.encode_frame(pixel_width as usize, pixel_height as usize, &pixels)?;
        info!(path = %path.display(), ?stats, "frame done");
    }

    let mut w = BufWriter::new(File::create(&output)?);
    encoder.serialize(&mut w)?;
    drop(w);

    let size = std::fs::metadata(&output)?.len();
    println!(
        "Written {} frames ({size} bytes) to `{output}`",
        encoder.frame_count()
    );

    Ok(())
}

fn decode(options: Decode) -> Result<(), Box<dyn std::error::Error>> {
    let Decode { input, output } = options;

    let data = std::fs::read(&input)?;

    println!("Decoding `{input}`");

    let (header, canvases) = decode_to_canvases(&data)?;
    let (pixel_width, pixel_height) = (u32::from(header.width) * 2, u32::from(header.height) * 4);

    std::fs::create_dir_all(&output)?;
    let palette = Palette::tier3();
    for (i, canvas) in canvases.iter().enumerate() {
        let raw = canvas.to_rgb(&palette).concat();
        let path = Path::new(&output).join(format!("frame_{i:05}.png"));
        RgbImage::from_vec(pixel_width, pixel_height, raw)
            .ok_or("failed to create image")?
            .save(&path)?;
    }

    println!(
        "Written {} {pixel_width}x{pixel_height} frames to `{output}`",
        canvases.len()
    );

    Ok(())
}
