// ============================================================================
// selector: headless driver for the selection model
// ============================================================================
//
// Usage examples:
//   selector --image wall.png --corners "10,10;90,20;85,80;15,70" --paste poster.png -o out.png
//   selector --image wall.png --corners "10,10;90,20;85,80;15,70" --shape circle --color ff0000ff -o out.png
//   selector --image photo.png --corners "5,5;60,5;40,50" --save-selection crop.png
//
// Four corners select with the four-corner variant; any other count traces a
// point-to-point polygon and finishes it explicitly.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use image::Rgba;
use log::info;

use image_selector::{
    LogEventHandler, Point, ProcessingStatus, SelectionModel, SelectorConfig, ShapeKind, VariantKind,
};

/// Select a region of an image and fill, extract or paste into it.
#[derive(Parser, Debug)]
#[command(name = "selector", about = "Headless region selection and perspective paste")]
struct CliArgs {
    /// Image to select on
    #[arg(short, long, value_name = "FILE")]
    image: PathBuf,

    /// Selection corners as "x,y;x,y;..." in placement order
    #[arg(short, long, value_parser = parse_corners)]
    corners: Corners,

    /// Image to warp onto the four corners
    #[arg(long, value_name = "FILE", conflicts_with = "shape")]
    paste: Option<PathBuf>,

    /// Shape to warp onto the four corners: circle, square, oval, triangle, pentagon
    #[arg(long)]
    shape: Option<ShapeKind>,

    /// Shape color as RRGGBBAA
    #[arg(long, default_value = "000000ff", value_parser = parse_color)]
    color: Rgba<u8>,

    /// Edge length of the rendered shape in pixels
    #[arg(long, default_value_t = 256)]
    size: u32,

    /// Fill the selection with RRGGBBAA before pasting
    #[arg(long, value_parser = parse_color)]
    fill: Option<Rgba<u8>>,

    /// JSON config file; missing files fall back to defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the resulting image
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the selected region as PNG
    #[arg(long, value_name = "FILE")]
    save_selection: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct Corners(Vec<Point>);

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(CliArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SelectorConfig::load(path)?,
        None => SelectorConfig::default(),
    };
    let corners = &args.corners.0;
    config.variant = if corners.len() == 4 {
        VariantKind::FourCorner
    } else {
        VariantKind::PointToPoint
    };

    let mut model = SelectionModel::new(config);
    model.subscribe(Box::new(LogEventHandler::new()));
    model.set_image(image::open(&args.image)?.to_rgba8())?;

    for &corner in corners {
        model.add_point(corner)?;
    }
    if model.state().is_selecting() {
        model.finish_selection()?;
    }

    if let Some(color) = args.fill {
        model.fill_selection(color)?;
    }

    if let Some(path) = &args.paste {
        model.add_perspective_image(image::open(path)?.to_rgba8())?;
    } else if let Some(kind) = args.shape {
        model.add_perspective_shape(kind, args.size, args.color)?;
    }
    if let ProcessingStatus::Failed(job) = model.wait_for_processing() {
        return Err(format!("paste job {job} failed").into());
    }

    if let Some(path) = &args.save_selection {
        model.save_selection(BufWriter::new(File::create(path)?))?;
        info!("selection written to {}", path.display());
    }

    if let Some(path) = &args.output {
        if let Some(image) = model.image() {
            image.save(path)?;
            info!("image written to {}", path.display());
        }
    }
    Ok(())
}

fn parse_corners(s: &str) -> Result<Corners, String> {
    s.split(';')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| -> Result<Point, String> {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| format!("expected x,y but got {pair:?}"))?;
            let x = x.trim().parse::<i32>().map_err(|e| format!("bad x in {pair:?}: {e}"))?;
            let y = y.trim().parse::<i32>().map_err(|e| format!("bad y in {pair:?}: {e}"))?;
            Ok(Point::new(x, y))
        })
        .collect::<Result<Vec<_>, String>>()
        .map(Corners)
}

fn parse_color(s: &str) -> Result<Rgba<u8>, String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 8 || !hex.is_ascii() {
        return Err(format!("expected RRGGBBAA, got {s:?}"));
    }
    let mut channels = [0u8; 4];
    for (i, channel) in channels.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|e| format!("bad color {s:?}: {e}"))?;
    }
    Ok(Rgba(channels))
}
