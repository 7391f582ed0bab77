mod logger;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use logger::ConsoleLogger;
use std::path::PathBuf;
use strip_paginate::{
    BatchManifest, BatchUpdate, ChunkFormat, PipelineOptions, WorkResult, WorkStatus, WorkUnit,
};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "stripdf",
    about = "Stitch page images into tall strips and paginate them into PDFs",
    version
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one work's page images into a document
    Run {
        /// Work identifier, used to name the output document
        #[arg(long)]
        id: String,

        /// Source images in reading order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,

        /// Print segmentation statistics only, don't generate a PDF
        #[arg(long)]
        stats_only: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert every work listed in a JSON manifest
    Batch {
        /// Manifest file: {"works": [{"id": ..., "sources": [...]}]}
        #[arg(short, long)]
        manifest: PathBuf,

        #[command(flatten)]
        tuning: Tuning,

        /// Works processed at the same time
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default options to a JSON file
    InitConfig {
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct Tuning {
    /// Options JSON file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Directory to keep the strip and chunk images in
    #[arg(long)]
    intermediate_dir: Option<PathBuf>,

    /// Normalized page width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Minimum background band height to cut at
    #[arg(long)]
    min_band_height: Option<u32>,

    /// Maximum distinct quantized colors in a background row
    #[arg(long)]
    max_colors: Option<usize>,

    /// Chunk byte ceiling in MiB
    #[arg(long)]
    max_chunk_mb: Option<u64>,

    /// Chunk height ceiling in pixels
    #[arg(long)]
    max_chunk_height: Option<u32>,

    /// Chunk encoding
    #[arg(long, value_enum)]
    chunk_format: Option<ChunkFormatArg>,

    /// Output resolution in DPI
    #[arg(long)]
    dpi: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ChunkFormatArg {
    Png,
    Jpeg,
}

impl From<ChunkFormatArg> for ChunkFormat {
    fn from(arg: ChunkFormatArg) -> Self {
        match arg {
            ChunkFormatArg::Png => Self::Png,
            ChunkFormatArg::Jpeg => Self::Jpeg {
                quality: strip_paginate::constants::DEFAULT_JPEG_QUALITY,
            },
        }
    }
}

impl Tuning {
    async fn resolve(&self) -> Result<PipelineOptions> {
        let mut options = match &self.config {
            Some(path) => PipelineOptions::load(path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
            None => PipelineOptions::default(),
        };
        if let Some(dir) = &self.output_dir {
            options.output_dir = dir.clone();
        }
        if let Some(dir) = &self.intermediate_dir {
            options.intermediate_dir = Some(dir.clone());
        }
        if let Some(width) = self.width {
            options.target_width = width;
        }
        if let Some(height) = self.min_band_height {
            options.min_band_height = height;
        }
        if let Some(colors) = self.max_colors {
            options.max_distinct_colors = colors;
        }
        if let Some(mb) = self.max_chunk_mb {
            options.repack_max_bytes = mb * strip_paginate::constants::MIB;
        }
        if let Some(height) = self.max_chunk_height {
            options.repack_max_height = height;
        }
        if let Some(format) = self.chunk_format {
            options.chunk_format = format.into();
        }
        if let Some(dpi) = self.dpi {
            options.dpi = dpi;
        }
        options.validate()?;
        Ok(options)
    }
}

fn print_result(result: &WorkResult) {
    let status = match result.status {
        WorkStatus::Success => "ok",
        WorkStatus::PartialFailure => "partial",
        WorkStatus::Failure => "FAILED",
    };
    match &result.output_path {
        Some(path) => println!(
            "[{}] {} → {} ({} pages)",
            status,
            result.work_id,
            path.display(),
            result.page_count
        ),
        None => println!(
            "[{}] {}: {}",
            status,
            result.work_id,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
    for skipped in &result.skipped_sources {
        println!("    skipped {} ({:?}): {}", skipped.path.display(), skipped.kind, skipped.reason);
    }
    if result.dropped_pages > 0 {
        println!("    dropped pages: {}", result.dropped_pages);
    }
    for chunk in &result.oversized_chunks {
        println!(
            "    oversized chunk {}: {} bytes > {} ({}px tall)",
            chunk.index + 1,
            chunk.encoded_bytes,
            chunk.limit,
            chunk.height
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ConsoleLogger::new(ConsoleLogger::level_for(cli.verbose, cli.quiet)).init()?;

    match cli.command {
        Commands::Run {
            id,
            input,
            tuning,
            stats_only,
            json,
        } => {
            let options = tuning.resolve().await?;
            let work = WorkUnit::new(id, input);

            if stats_only {
                let merged = strip_paginate::merge_strip(&work.sources, options.target_width)?;
                let stats = strip_paginate::calculate_statistics(&merged.strip, &options)?;
                println!("Segmentation Statistics:");
                println!("  Strip: {}x{}", stats.strip_width, stats.strip_height);
                println!("  Skipped sources: {}", merged.skipped.len());
                if stats.scan_skipped {
                    println!("  Scan skipped: strip too short");
                }
                println!("  Bands: {} ({} background)", stats.bands, stats.background_bands);
                println!("  Cuts: {:?}", stats.cuts);
                println!("  Segments: {}", stats.segments);
                println!("  Forced slices: {}", stats.forced_slices);
                return Ok(());
            }

            let result = strip_paginate::process_work(work, options).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            if result.status == WorkStatus::Failure {
                std::process::exit(1);
            }
        }

        Commands::Batch {
            manifest,
            tuning,
            jobs,
            json,
        } => {
            let mut options = tuning.resolve().await?;
            if let Some(jobs) = jobs {
                options.max_parallel_works = jobs;
            }
            let manifest = BatchManifest::load(&manifest)
                .await
                .with_context(|| format!("loading {}", manifest.display()))?;

            let (tx, mut rx) = mpsc::unbounded_channel();
            let progress = tokio::spawn(async move {
                while let Some(update) = rx.recv().await {
                    match update {
                        BatchUpdate::Started {
                            work_id,
                            position,
                            total,
                        } => log::info!("Started '{}' ({}/{})", work_id, position + 1, total),
                        BatchUpdate::Finished {
                            result,
                            completed,
                            total,
                        } => log::info!(
                            "Finished '{}' as {:?} [{}/{}]",
                            result.work_id,
                            result.status,
                            completed,
                            total
                        ),
                    }
                }
            });

            let results = strip_paginate::process_batch(manifest.works, &options, Some(tx)).await?;
            progress.await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    print_result(result);
                }
                let failed = results
                    .iter()
                    .filter(|r| r.status == WorkStatus::Failure)
                    .count();
                println!(
                    "{} works: {} succeeded, {} failed",
                    results.len(),
                    results.len() - failed,
                    failed
                );
            }
        }

        Commands::InitConfig { output } => {
            PipelineOptions::default().save(&output).await?;
            println!("Wrote default options → {}", output.display());
        }
    }

    Ok(())
}
