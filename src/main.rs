use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use hufunzip::config::{DecoderConfig, DEFAULT_CONFIG_FILE};
use hufunzip::engine::peek_header;
use hufunzip::utils::io::ByteCursor;
use hufunzip::{
    check_extension, decompress_file, default_destination, ArchiveFs, DecodeEvent, DecodeReport, LocalFs,
};

#[derive(Parser)]
#[command(name = "hufunzip")]
#[command(about = "Huffman archive decompression")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Config file path")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[arg(long, short, global = true, help = "Trace-level logging")]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Decompress an archive into a folder
    Decompress {
        archive: PathBuf,

        #[arg(long, short, help = "Destination folder (default: next to the archive)")]
        output: Option<PathBuf>,
    },
    /// Show the archive header without writing anything
    Inspect {
        archive: PathBuf,
    },
    /// Write a config file with default settings
    GenerateConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE, help = "Config file path")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = DecoderConfig::load(cli.config.as_deref())?;

    let filter = if cli.verbose { "hufunzip=trace".to_string() } else { config.log_filter.clone() };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Decompress { archive, output } => {
            run_decompress(&archive, output, &config, cli.json).await
        }
        Commands::Inspect { archive } => {
            run_inspect(&archive, &config, cli.json).await
        }
        Commands::GenerateConfig { output } => {
            DecoderConfig::default().save(&output)?;
            if cli.json {
                println!("{}", serde_json::json!({"success": true, "config_file": output}));
            } else {
                println!("✅ Config written to {}", output.display());
            }
            Ok(())
        }
    }
}

async fn run_decompress(
    archive: &Path,
    output: Option<PathBuf>,
    config: &DecoderConfig,
    json: bool,
) -> anyhow::Result<()> {
    if config.require_extension {
        if let Err(e) = check_extension(archive, &config.extension) {
            report_error(json, &e);
            return Err(e.into());
        }
    }

    let destination = output.unwrap_or_else(|| default_destination(archive, &config.output_suffix));
    let fs = LocalFs::new();
    if config.create_destination && !fs.exists(&destination).await {
        fs.create_directories(&destination)
            .await
            .with_context(|| format!("couldn't create destination {:?}", destination))?;
        info!("Created destination directory: {:?}", destination);
    }

    let options = config.decode_options();
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current byte");
            cancel.cancel();
        }
    });

    if !json {
        println!("📦 Huffman Decompression");
        println!("========================");
        println!("Decompressing {} ...", archive.display());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<DecodeEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if json {
                continue;
            }
            if let DecodeEvent::FileOpened { path, .. } = event {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                println!("   Writing into : {}", name);
            }
        }
    });

    let start = Instant::now();
    let result = decompress_file(archive, &destination, &fs, &options, tx).await;
    let _ = printer.await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(report) => {
            print_report(&report, elapsed, json)?;
            Ok(())
        }
        Err(e) => {
            error!("decompression failed: {}", e);
            report_error(json, &e);
            Err(e.into())
        }
    }
}

fn print_report(report: &DecodeReport, elapsed: f64, json: bool) -> anyhow::Result<()> {
    if json {
        let mut value = serde_json::to_value(report)?;
        value["elapsed_seconds"] = serde_json::json!(elapsed);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("✅ Decompression completed");
    println!("   Files obtained      : {}", report.files.len());
    println!("   Decompressed folder : {}", report.destination.display());
    println!("   Archive SHA-256     : {}", report.archive_sha256);
    println!("   Decompression time  : {:.3} seconds", elapsed);
    Ok(())
}

async fn run_inspect(archive: &Path, config: &DecoderConfig, json: bool) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(archive)
        .await
        .with_context(|| format!("couldn't open {:?}", archive))?;
    let mut cursor = ByteCursor::new(file, archive);

    let (tree, entries) = match peek_header(&mut cursor, config.path_separator).await {
        Ok(header) => header,
        Err(e) => {
            report_error(json, &e);
            return Err(e.into());
        }
    };
    let total: u64 = entries.iter().map(|e| e.byte_count as u64).sum();

    if json {
        let files: Vec<_> = entries
            .iter()
            .map(|e| serde_json::json!({"path": e.relative_path(), "bytes": e.byte_count}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "tree_nodes": tree.len(),
            "symbols": tree.leaf_count(),
            "max_code_bits": tree.height(),
            "payload_offset": cursor.offset(),
            "total_bytes": total,
            "files": files,
        }))?);
    } else {
        println!("🔍 Archive Header");
        println!("=================");
        println!("   Tree nodes     : {}", tree.len());
        println!("   Symbols        : {}", tree.leaf_count());
        println!("   Max code bits  : {}", tree.height());
        println!("   Payload offset : {}", cursor.offset());
        println!("   {} file(s), {} bytes total", entries.len(), total);
        for entry in &entries {
            println!("   {:>12}  {}", entry.byte_count, entry.relative_path().display());
        }
    }
    Ok(())
}

fn report_error(json: bool, e: &hufunzip::DecodeError) {
    if json {
        println!("{}", serde_json::json!({"error": e.to_string()}));
    } else {
        eprintln!("❌ {}", e);
    }
}
