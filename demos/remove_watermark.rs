//! Detect and remove corner watermarks from a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_watermark -- input.png output.png
//! ```

use std::env;
use std::process;

use corner_watermark_removal::{ProcessOptions, Stage, WatermarkProcessor};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let processor = WatermarkProcessor::new();
    let opts = ProcessOptions::default();
    let result = processor.process_file_with_progress(
        input.as_ref(),
        output.as_ref(),
        &opts,
        |stage: Stage| println!("[{:>3}%] {stage:?}", stage.percent()),
    );

    if result.skipped {
        println!("Skipped: {}", result.message);
    } else if result.success {
        println!("Done: {}", result.message);
        for region in &result.regions {
            println!("  {region}");
        }
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
