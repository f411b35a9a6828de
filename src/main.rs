use anyhow::Result;
use spinescan::batch::process_directory;
use spinescan::config::PageSegMode;
use spinescan::{
    build_report, EngineConfig, PipelineConfig, SpineError, TesseractEngine, TextExtractor,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` controls verbosity; the
/// default is `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} <image-or-directory> <output-dir>\n\n\
         Extracts text from a book spine/cover photograph (or every image\n\
         in a directory) and prints a JSON report per image. Normalized\n\
         intermediate images are written into <output-dir>.",
        program
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        return Err(anyhow::anyhow!(usage(&args[0])));
    }
    let input = PathBuf::from(&args[1]);
    let output_dir = PathBuf::from(&args[2]);

    std::fs::create_dir_all(&output_dir).map_err(|e| {
        SpineError::Write(format!(
            "cannot create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let pipeline_config = PipelineConfig::default();
    pipeline_config.validate()?;

    let engine_config = EngineConfig::default();
    engine_config.validate()?;

    let extractor = Arc::new(TextExtractor::new(
        Arc::new(TesseractEngine::new(engine_config)),
        PageSegMode::default_extraction_modes(),
    ));

    if input.is_dir() {
        let results =
            process_directory(&input, &output_dir, pipeline_config, Arc::clone(&extractor))
                .await?;
        info!("Processed {} images", results.len());
        for (path, report) in &results {
            println!("=== {}", path.display());
            match report {
                Some(report) => println!("{}", serde_json::to_string_pretty(report)?),
                None => println!("null"),
            }
        }
    } else {
        let output_path = spinescan::batch::normalized_output_path(&input, &output_dir);
        let report = tokio::task::spawn_blocking(move || {
            build_report(&input, &output_path, &pipeline_config, &extractor)
        })
        .await??;
        match report {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => println!("null"),
        }
    }

    Ok(())
}
