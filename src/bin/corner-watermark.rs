use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use corner_watermark_removal::{
    default_output_path, FillMode, ProcessOptions, ProcessResult, Region, WatermarkProcessor,
    DETECTION_THRESHOLD,
};

#[derive(Parser)]
#[command(
    name = "corner-watermark",
    about = "Detect corner watermarks and erase them by local-average inpainting",
    version,
    after_help = "Simple usage: corner-watermark <image>  (writes <name>_cleaned.png)\n\n\
                  NOTE: Only the four 80x60 corner areas are examined. Use --region to\n\
                  clean anything else."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_cleaned.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Skip detection and fill all four corner probes
    #[arg(short, long)]
    force: bool,

    /// Detection confidence threshold (0.0-1.0)
    #[arg(short, long, default_value_t = DETECTION_THRESHOLD)]
    threshold: f64,

    /// Fill each region from a frozen copy instead of in place
    #[arg(long)]
    snapshot_fill: bool,

    /// Fill this region instead of detecting, as x,y,width,height (repeatable)
    #[arg(long = "region", value_parser = parse_region)]
    regions: Vec<Region>,

    /// Also write {output}_regions.png with detected regions highlighted
    #[arg(long)]
    overlay: bool,

    /// Print one JSON result per image to stdout
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_region(s: &str) -> Result<Region, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid region '{s}': {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(Region::new(x, y, width, height).with_confidence(1.0)),
        _ => Err(format!("invalid region '{s}': expected x,y,width,height")),
    }
}

/// Log output goes to stderr; stdout is reserved for `--json` results.
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool, quiet: bool, json_format: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_json);

    let opts = ProcessOptions {
        force: cli.force,
        threshold: cli.threshold,
        fill_mode: if cli.snapshot_fill {
            FillMode::Snapshot
        } else {
            FillMode::InPlace
        },
        regions: cli.regions,
        overlay: cli.overlay,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Err(e) = opts.validate() {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let processor = WatermarkProcessor::new();

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet {
        if !opts.regions.is_empty() {
            eprintln!("Filling {} supplied region(s)", opts.regions.len());
        } else if opts.force {
            eprintln!("WARNING: Force mode - filling all four corners without detection!");
        } else {
            eprintln!(
                "Auto-detection enabled (threshold: {:.0}%)",
                opts.threshold * 100.0
            );
        }
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: corner-watermark <input_dir> -o <output_dir>");
            process::exit(1);
        };
        processor.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![processor.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut skip_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if cli.json {
            match r.to_json() {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: {e}"),
            }
        }
        if r.skipped {
            skip_count += 1;
        } else if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if skip_count > 0 {
            eprint!(", Skipped: {skip_count}");
        }
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!(
                "[OK] {filename} ({:.0}% confidence)",
                result.confidence() * 100.0
            );
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose {
        for region in &result.regions {
            eprintln!("  -> {region}");
        }
    }
}
