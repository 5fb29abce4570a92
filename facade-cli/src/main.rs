use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use facade::annotation::{self, FileMappingSummary, MappedGeometry};
use facade::config::RectifyConfig;
use facade::diagnostics::Diagnostic;
use facade::geometry::{Direction, Point2D, Size};
use facade::homography::HeightPolicy;
use facade::mapper::AnnotationMapper;
use facade::record::TransformRecord;
use facade::rectify::Rectifier;
use facade::resolve::{PointFixture, Strategy};

/// Facade rectification: build perspective transforms from marked corners and
/// map annotations between original and rectified images
#[derive(Parser)]
#[command(name = "facade", version)]
struct Cli {
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve marked points into a transform record.
    Rectify {
        /// Point fixture JSON ({"points": [...]} or {"edges": {...}})
        fixture: PathBuf,

        /// Source image; its dimensions give the original size
        #[arg(long, conflicts_with_all = ["width", "height"])]
        image: Option<PathBuf>,

        /// Original image width (when no --image is given)
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Original image height (when no --image is given)
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// How the rectified height is chosen
        #[arg(long, value_enum)]
        height_policy: Option<HeightArg>,

        /// Rectified height for --height-policy fixed
        #[arg(long)]
        fixed_height: Option<u32>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// De-duplication radius in pixels
        #[arg(long)]
        dedup_tolerance: Option<f64>,

        /// Minimum accepted quadrilateral area
        #[arg(long)]
        min_area: Option<f64>,

        /// Output transform record
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Map points, shapes or an annotation file through a transform record.
    Map {
        /// Transform record JSON
        transform: PathBuf,

        /// Map a single point
        #[arg(short, long, num_args = 2, value_names = ["X", "Y"])]
        point: Option<Vec<f64>>,

        /// Map a rectangle given by two opposite corners
        #[arg(short, long, num_args = 4, value_names = ["X1", "Y1", "X2", "Y2"])]
        rectangle: Option<Vec<f64>>,

        /// Map a circle
        #[arg(short, long, num_args = 3, value_names = ["CX", "CY", "R"])]
        circle: Option<Vec<f64>>,

        /// Annotation file to map (requires --output)
        #[arg(short, long, requires = "output")]
        file: Option<PathBuf>,

        /// Output annotation file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Map original → rectified instead of rectified → original
        #[arg(long)]
        forward: bool,

        /// Boundary samples per circle
        #[arg(long, default_value = "16")]
        samples: usize,
    },
    /// Validate a transform record and print its summary.
    Inspect {
        /// Transform record JSON
        transform: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HeightArg {
    PassThrough,
    AspectNormalized,
    Fixed,
}

#[derive(Serialize)]
struct RectifyOutput {
    transform_file: String,
    strategy: Strategy,
    original_size: Size,
    rectified_size: Size,
    source_points: [Point2D; 4],
    diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct FileMapOutput {
    output_file: String,
    #[serde(flatten)]
    summary: FileMappingSummary,
}

#[derive(Serialize)]
struct InspectOutput {
    source_image: String,
    original_size: Size,
    rectified_size: Size,
    source_area: f64,
    forward_determinant: f64,
    inverse_residual: f64,
    out_of_frame_ratio: f64,
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn original_size(image_path: Option<&PathBuf>, width: Option<u32>, height: Option<u32>) -> Result<Size> {
    match (image_path, width, height) {
        (Some(path), _, _) => {
            let (w, h) = image::image_dimensions(path)
                .with_context(|| format!("failed to read image: {}", path.display()))?;
            Ok(Size::new(w, h))
        }
        (None, Some(w), Some(h)) => Ok(Size::new(w, h)),
        _ => bail!("either --image or both --width and --height are required"),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_rectify(
    fixture: PathBuf,
    image: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    height_policy: Option<HeightArg>,
    fixed_height: Option<u32>,
    config: Option<PathBuf>,
    dedup_tolerance: Option<f64>,
    min_area: Option<f64>,
    output: PathBuf,
    pretty: bool,
) -> Result<()> {
    let mut cfg = match &config {
        Some(path) => RectifyConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => RectifyConfig::default(),
    };
    if let Some(t) = dedup_tolerance {
        cfg.resolver.dedup_tolerance = t;
    }
    if let Some(a) = min_area {
        cfg.resolver.min_area = a;
    }
    match (height_policy, fixed_height) {
        (Some(HeightArg::PassThrough), _) => cfg.height = HeightPolicy::PassThrough,
        (Some(HeightArg::AspectNormalized), _) => cfg.height = HeightPolicy::AspectNormalized,
        (Some(HeightArg::Fixed), Some(h)) | (None, Some(h)) => cfg.height = HeightPolicy::Fixed(h),
        (Some(HeightArg::Fixed), None) => bail!("--height-policy fixed requires --fixed-height"),
        (None, None) => {}
    }
    cfg.validate().context("invalid rectification settings")?;

    let fixture_points = PointFixture::load(&fixture)
        .with_context(|| format!("failed to load point fixture: {}", fixture.display()))?;
    let size = original_size(image.as_ref(), width, height)?;
    let source_image = image
        .as_ref()
        .unwrap_or(&fixture)
        .display()
        .to_string();

    let out = Rectifier::new(cfg)
        .rectify_from(&fixture_points, &source_image, size)
        .context("rectification failed")?;
    out.record
        .save(&output)
        .with_context(|| format!("failed to write transform: {}", output.display()))?;

    log::info!("transform written to {}", output.display());
    print_json(
        &RectifyOutput {
            transform_file: output.display().to_string(),
            strategy: out.strategy,
            original_size: out.record.original_size(),
            rectified_size: out.record.rectified_size(),
            source_points: *out.record.source_quadrilateral().corners(),
            diagnostics: out.diagnostics,
        },
        pretty,
    )
}

#[allow(clippy::too_many_arguments)]
fn run_map(
    transform: PathBuf,
    point: Option<Vec<f64>>,
    rectangle: Option<Vec<f64>>,
    circle: Option<Vec<f64>>,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    forward: bool,
    samples: usize,
    pretty: bool,
) -> Result<()> {
    let record = TransformRecord::load(&transform)
        .with_context(|| format!("failed to load transform: {}", transform.display()))?;
    let mapper = AnnotationMapper::new(&record).with_circle_samples(samples);
    let direction = if forward {
        Direction::Forward
    } else {
        Direction::Reverse
    };

    let mut results: Vec<MappedGeometry> = Vec::new();
    if let Some(&[x, y]) = point.as_deref() {
        results.push(MappedGeometry::Point {
            point: mapper.map_point(x, y, direction)?,
        });
    }
    if let Some(&[x1, y1, x2, y2]) = rectangle.as_deref() {
        results.push(mapper.map_rectangle(x1, y1, x2, y2, direction)?);
    }
    if let Some(&[cx, cy, r]) = circle.as_deref() {
        results.push(mapper.map_circle(cx, cy, r, direction, samples)?);
    }

    if results.is_empty() && file.is_none() {
        bail!("nothing to map: pass --point, --rectangle, --circle or --file");
    }
    if !results.is_empty() {
        print_json(&results, pretty)?;
    }

    if let (Some(input), Some(output)) = (&file, &output) {
        let summary = annotation::map_annotation_file(&mapper, &transform, input, output, direction)
            .with_context(|| format!("failed to map annotations: {}", input.display()))?;
        log::info!("annotations written to {}", output.display());
        print_json(
            &FileMapOutput {
                output_file: output.display().to_string(),
                summary,
            },
            pretty,
        )?;
    }
    Ok(())
}

fn run_inspect(transform: PathBuf, pretty: bool) -> Result<()> {
    let record = TransformRecord::load(&transform)
        .with_context(|| format!("invalid transform: {}", transform.display()))?;
    print_json(
        &InspectOutput {
            source_image: record.source_image().to_string(),
            original_size: record.original_size(),
            rectified_size: record.rectified_size(),
            source_area: record.source_quadrilateral().area(),
            forward_determinant: record.forward_matrix().determinant(),
            inverse_residual: record.forward_matrix().inverse_residual(record.inverse_matrix()),
            out_of_frame_ratio: record.out_of_frame_ratio(32),
        },
        pretty,
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Rectify {
            fixture,
            image,
            width,
            height,
            height_policy,
            fixed_height,
            config,
            dedup_tolerance,
            min_area,
            output,
        } => run_rectify(
            fixture,
            image,
            width,
            height,
            height_policy,
            fixed_height,
            config,
            dedup_tolerance,
            min_area,
            output,
            cli.pretty,
        ),
        Command::Map {
            transform,
            point,
            rectangle,
            circle,
            file,
            output,
            forward,
            samples,
        } => run_map(
            transform, point, rectangle, circle, file, output, forward, samples, cli.pretty,
        ),
        Command::Inspect { transform } => run_inspect(transform, cli.pretty),
    }
}
