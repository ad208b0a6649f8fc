//! # Niimbot CLI
//!
//! Command-line interface for Niimbot label printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print one label on a D11
//! niimbot print --port /dev/ttyACM0 --image label.png
//!
//! # Three copies on a B21, darker
//! niimbot print --model b21 --image label.png --density 3 --quantity 3
//!
//! # Save the binarized preview instead of printing
//! niimbot print --image label.png --png preview.png
//!
//! # Show the packets an image encodes to, without a printer
//! niimbot encode --image label.png
//!
//! # List supported models
//! niimbot models --json
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` takes precedence over `-v`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use niimbot::{
    LabelPrinter, PrinterModel, ProtocolError,
    protocol::codes::code_name,
    render::{binarize, encoder},
    transport::{SerialTransport, serial::DEFAULT_DEVICE},
};

/// Niimbot - Thermal label printer utility
#[derive(Parser, Debug)]
#[command(name = "niimbot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image as a label
    Print {
        /// Serial device of the printer
        #[arg(long, default_value = DEFAULT_DEVICE)]
        port: PathBuf,

        /// Image file to print
        #[arg(long)]
        image: PathBuf,

        /// Printer model
        #[arg(long, default_value = "d11", value_parser = PrinterModel::parse)]
        model: PrinterModel,

        /// Label type (1 = gap, 2 = black mark, 3 = continuous)
        #[arg(long, default_value_t = 1)]
        label_type: u8,

        /// Print density (defaults to the model's default)
        #[arg(long)]
        density: Option<u8>,

        /// Number of copies
        #[arg(long, default_value_t = 1)]
        quantity: u16,

        /// Output to PNG file instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Show the packet sequence an image encodes to (no printer needed)
    Encode {
        /// Image file to encode
        #[arg(long)]
        image: PathBuf,
    },

    /// List supported printer models
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "warn,niimbot=info",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), ProtocolError> {
    match command {
        Commands::Print {
            port,
            image,
            model,
            label_type,
            density,
            quantity,
            png,
        } => {
            let density = density.unwrap_or(model.default_density);
            model.validate_label_type(label_type)?;
            model.validate_density(density)?;
            if quantity == 0 {
                return Err(ProtocolError::InvalidArgument(
                    "Quantity must be at least 1".to_string(),
                ));
            }

            let bitmap = load(&image)?;
            model.validate_image(bitmap.width(), bitmap.height())?;

            if let Some(png_path) = png {
                bitmap
                    .to_gray_image()
                    .save(&png_path)
                    .map_err(|e| ProtocolError::Image(format!("Failed to save PNG: {}", e)))?;
                println!("Saved to {}", png_path.display());
                return Ok(());
            }

            println!(
                "Printing {} ({}x{}) on {}...",
                image.display(),
                bitmap.width(),
                bitmap.height(),
                model.name
            );
            let transport = SerialTransport::open(&port)?;
            let mut printer = LabelPrinter::new(transport, model);
            printer.print_label(&bitmap, label_type, density, quantity)?;
            println!("Printed {} label(s)", quantity);
        }

        Commands::Encode { image } => {
            let bitmap = load(&image)?;
            let runs = encoder::scanline_runs(&bitmap);
            println!(
                "{}x{} pixels, {} runs",
                bitmap.width(),
                bitmap.height(),
                runs.len()
            );
            for run in &runs {
                let packet = encoder::encode_run(run)?;
                println!(
                    "{:<15} row={:<5} repeat={:<3} {}",
                    code_name(packet.kind()),
                    run.start_row,
                    run.repeat_count,
                    hex(&packet.encode())
                );
            }
        }

        Commands::Models { json } => {
            let models = PrinterModel::built_in();
            if json {
                let out = serde_json::to_string_pretty(&models).map_err(std::io::Error::from)?;
                println!("{}", out);
                return Ok(());
            }

            println!("Available models:");
            for model in models {
                let height = model
                    .max_height
                    .map_or_else(|| "any".to_string(), |h| h.to_string());
                println!(
                    "  {:<4} max {}x{} dots{}, density {}-{}, profile {}",
                    model.name,
                    model.max_width,
                    height,
                    if model.portrait_only { ", portrait" } else { "" },
                    model.density_min,
                    model.density_max,
                    model.profile.name
                );
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<niimbot::render::bitmap::Bitmap, ProtocolError> {
    if !path.is_file() {
        return Err(ProtocolError::InvalidArgument(format!(
            "Image file not found: {}",
            path.display()
        )));
    }
    let bitmap = binarize::load_bitmap(path)?;
    info!(
        path = %path.display(),
        width = bitmap.width(),
        height = bitmap.height(),
        "loaded image"
    );
    Ok(bitmap)
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
