use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info};
use prodmatch_cli::render::{draw_correspondences, side_by_side};
use prodmatch_cli::run_config::RunConfig;
use prodmatch_cli::{
    Comparison, PipelineConfig, PipelineError, PipelineResult, ProductMatcher, ScorerStrategy, configure_threads,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

/// Decide whether two product photos show the same product
#[derive(Parser, Debug)]
#[command(name = "prodmatch", version)]
#[command(about = "Compare product images by aligned gradient-histogram distance", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two image files
    Compare {
        /// Image warped onto the reference
        image_1: PathBuf,
        /// Reference image
        image_2: PathBuf,

        /// Distances strictly below this mean "same product"
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Canonical square size both images are resized to
        #[arg(long)]
        size: Option<u32>,

        #[arg(long, value_enum)]
        scorer: Option<Scorer>,

        /// Skip the homography alignment stage
        #[arg(long)]
        no_align: bool,

        /// Pipeline settings (.json or .toml); flags override it
        #[arg(long)]
        pipeline_config: Option<PathBuf>,

        /// Write the two preprocessed images side by side
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the inlier correspondences of the alignment
        #[arg(long)]
        annotate: Option<PathBuf>,
    },
    /// Run a comparison described by a JSON or TOML run file
    Run {
        config: PathBuf,

        /// Refuse image paths that leave the run file's directory
        #[arg(long)]
        sandbox: bool,
    },
    /// List the product images in a directory
    List { dir: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Scorer {
    /// Normalized gradient-histogram distance
    Gradient,
    /// Raw pixel distance (legacy)
    Raw,
}

impl From<Scorer> for ScorerStrategy {
    fn from(s: Scorer) -> Self {
        match s {
            Scorer::Gradient => ScorerStrategy::GradientDescriptorDistance,
            Scorer::Raw => ScorerStrategy::RawPixelDistance,
        }
    }
}

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let threads = cli.threads.unwrap_or_else(num_threads_default);
    let outcome = configure_threads(threads).and_then(|()| match cli.command {
        Command::Compare {
            image_1,
            image_2,
            threshold,
            size,
            scorer,
            no_align,
            pipeline_config,
            output,
            annotate,
        } => pipeline_from_flags(pipeline_config.as_deref(), threshold, size, scorer, no_align)
            .and_then(|cfg| run_comparison(&cfg, &image_1, &image_2, output.as_deref(), annotate.as_deref())),
        Command::Run { config, sandbox } => run_file(&config, sandbox),
        Command::List { dir } => list_images(&dir),
    });

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn num_threads_default() -> usize {
    PipelineConfig::default().vision.orb.n_threads
}

fn pipeline_from_flags(
    file: Option<&Path>,
    threshold: Option<f64>,
    size: Option<u32>,
    scorer: Option<Scorer>,
    no_align: bool,
) -> PipelineResult<PipelineConfig> {
    let mut cfg = match file {
        Some(path) => PipelineConfig::load(path).map_err(|e| PipelineError::Config(e.to_string()))?,
        None => PipelineConfig::default(),
    };
    if let Some(t) = threshold {
        cfg = cfg.with_threshold(t);
    }
    if let Some(s) = size {
        cfg = cfg.with_canonical_size(s, s);
    }
    if let Some(s) = scorer {
        cfg = cfg.with_strategy(s.into());
    }
    if no_align {
        cfg = cfg.without_alignment();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_comparison(
    cfg: &PipelineConfig,
    image_1: &Path,
    image_2: &Path,
    output: Option<&Path>,
    annotate: Option<&Path>,
) -> PipelineResult<()> {
    info!("{}", cfg.summary());
    let matcher = ProductMatcher::new(cfg.clone())?;

    let t0 = Instant::now();
    let comparison = matcher.compare_paths(image_1, image_2)?;
    info!("comparison took {:.2?}", t0.elapsed());

    print_result(&comparison);

    if let Some(path) = output {
        write_side_by_side(&comparison, path)?;
    }
    if let Some(path) = annotate {
        let source = image::open(image_1)?.to_luma8();
        let reference = image::open(image_2)?.to_luma8();
        draw_correspondences(&source, &reference, &comparison.alignment.inliers).save(path)?;
        println!("Correspondences saved to: {}", path.display());
    }
    Ok(())
}

fn print_result(comparison: &Comparison) {
    let result = &comparison.result;
    println!("Alignment: {}", comparison.alignment.status);
    println!("Distance: {:.4}", result.distance);
    println!("Threshold: {:.4}", result.threshold);
    if result.same {
        println!("\n>>> RESULT: SAME PRODUCT <<<");
    } else {
        println!("\n>>> RESULT: DIFFERENT PRODUCTS <<<");
    }
}

fn write_side_by_side(comparison: &Comparison, path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let (a, b) = &comparison.images;
    side_by_side(a, b).save(path)?;
    println!("Side-by-side image saved to: {}", path.display());
    Ok(())
}

fn run_file(path: &Path, sandbox: bool) -> PipelineResult<()> {
    let run = RunConfig::load(path)?;
    let base = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let cfg = run.pipeline_config()?;
    let (image_1, image_2) = run.image_paths(base, sandbox)?;
    let output = run.output_path(base, sandbox)?;
    run_comparison(&cfg, &image_1, &image_2, output.as_deref(), None)
}

fn list_images(dir: &Path) -> PipelineResult<()> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_owned))
        .collect();
    names.sort();

    for name in &names {
        println!("{}", dir.join(name).display());
    }
    if names.is_empty() {
        info!("no images in {}", dir.display());
    }
    Ok(())
}
