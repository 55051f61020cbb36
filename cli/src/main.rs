//! pptslim CLI - PowerPoint package size reduction
//!
//! A command-line tool that drops hidden slides, recompresses images and
//! prunes unused media from PPTX-family packages.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use pptslim::{CompressOptions, OptimizeOptions, OptimizePreset, Optimizer, Outcome};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// PowerPoint package size reduction
#[derive(Parser)]
#[command(
    name = "pptslim",
    author = "iyulab",
    version,
    about = "Shrink PowerPoint packages",
    long_about = "pptslim - PowerPoint package size reduction.\n\n\
                  Drops hidden slides, recompresses oversized images and prunes\n\
                  unused media from PPTX, PPTM, PPSX, PPSM, POTX and POTM files."
)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a package
    #[command(visible_alias = "opt")]
    Optimize {
        /// Input file path
        input: PathBuf,

        /// Output file path (default: <input>.optimized.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,

        /// Write the input unchanged when optimization fails
        #[arg(long)]
        keep_original_on_error: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show package information
    Info {
        /// Input file path
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Optimization settings; flags override the preset or config file.
#[derive(Args)]
struct Tuning {
    /// Starting preset
    #[arg(long, default_value = "standard")]
    preset: PresetMode,

    /// JSON options file used instead of the preset
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Remove hidden slides
    #[arg(long)]
    remove_hidden: bool,

    /// Recompress raster images
    #[arg(long)]
    compress: bool,

    /// Do not recompress images
    #[arg(long, conflicts_with = "compress")]
    no_compress: bool,

    /// Maximum image width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum image height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// Image quality in (0, 1]
    #[arg(long)]
    quality: Option<f32>,

    /// Remove media no part references
    #[arg(long)]
    remove_unused: bool,

    /// Replace unused media with 1x1 placeholders instead of deleting it
    #[arg(long)]
    placeholders: bool,

    /// Replace all media with placeholders
    #[arg(long)]
    placeholder_all: bool,

    /// ZIP deflate level (0-9, 0 stores entries)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    level: Option<u8>,
}

/// Optimization preset
#[derive(Clone, Copy, Default, ValueEnum)]
enum PresetMode {
    /// Drop unused media only
    Minimal,
    /// Also drop hidden slides and recompress images (default)
    #[default]
    Standard,
    /// Standard with smaller, lower-quality images
    Aggressive,
}

impl From<PresetMode> for OptimizePreset {
    fn from(mode: PresetMode) -> Self {
        match mode {
            PresetMode::Minimal => OptimizePreset::Minimal,
            PresetMode::Standard => OptimizePreset::Standard,
            PresetMode::Aggressive => OptimizePreset::Aggressive,
        }
    }
}

impl Tuning {
    fn to_options(&self) -> Result<OptimizeOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => OptimizeOptions::from_json(&fs::read_to_string(path)?)?,
            None => OptimizeOptions::from_preset(self.preset.into()),
        };

        if self.remove_hidden {
            options.remove_hidden_slides = true;
        }
        if self.remove_unused {
            options.remove_unused_media = true;
        }
        if self.placeholders {
            options.use_placeholders = true;
        }
        if self.placeholder_all {
            options.placeholder_all_media = true;
        }
        if let Some(level) = self.level {
            options.compression_level = level;
        }

        let tunes_images =
            self.max_width.is_some() || self.max_height.is_some() || self.quality.is_some();
        if self.no_compress {
            options.compress_images = None;
        } else if self.compress || tunes_images {
            let mut compress = options.compress_images.unwrap_or_default();
            if let Some(width) = self.max_width {
                compress.max_width = width;
            }
            if let Some(height) = self.max_height {
                compress.max_height = height;
            }
            if let Some(quality) = self.quality {
                compress.quality = quality;
            }
            options.compress_images = Some(compress);
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pptslim=info",
        _ => "pptslim=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Optimize {
            input,
            output,
            tuning,
            keep_original_on_error,
            json,
        } => {
            let options = tuning.to_options()?;
            let output = output.unwrap_or_else(|| default_output(&input));

            let pb = create_spinner("Reading package...");
            let data = fs::read(&input)?;
            pb.set_message("Optimizing...");

            let outcome = Optimizer::new(options).optimize_or_original(data);
            pb.finish_and_clear();

            match outcome {
                Outcome::Optimized(optimized) => {
                    fs::write(&output, &optimized.data)?;
                    let report = &optimized.report;
                    if json {
                        println!("{}", serde_json::to_string_pretty(report)?);
                        return Ok(());
                    }
                    for warning in &report.warnings {
                        println!("{} {}", "!".yellow().bold(), warning);
                    }
                    println!(
                        "{} {} → {} ({} → {}, {:.1}% smaller)",
                        "✓".green().bold(),
                        input.display(),
                        output.display(),
                        format_size(report.original_size),
                        format_size(report.optimized_size),
                        report.reduction_percent()
                    );
                    println!(
                        "  slides removed: {}, images compressed: {}, media removed: {}, placeholders: {}",
                        report.slides_removed,
                        report.images_compressed,
                        report.media_deleted,
                        report.placeholders_written
                    );
                }
                Outcome::Original { data, error } => {
                    if !keep_original_on_error {
                        return Err(error.into());
                    }
                    fs::write(&output, &data)?;
                    println!(
                        "{} Kept the original package: {}",
                        "!".yellow().bold(),
                        error
                    );
                }
            }
        }

        Commands::Info { input, json } => {
            let pb = create_spinner("Analyzing package...");
            let summary = pptslim::inspect_file(&input)?;
            pb.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("{}", "Package Information".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!("{}: {}", "Format".bold(), summary.format);
            println!(
                "{}: {} ({} hidden)",
                "Slides".bold(),
                summary.slide_count,
                summary.hidden_slide_count
            );
            println!(
                "{}: {} ({})",
                "Media".bold(),
                summary.media_count,
                format_size(summary.media_bytes)
            );

            if !summary.unused_media.is_empty() {
                println!("\n{}", "Unused Media".cyan().bold());
                println!("{}", "─".repeat(40));
                for path in &summary.unused_media {
                    println!("  {}", path);
                }
            }
            for failure in &summary.usage_failures {
                println!("{} {}", "!".yellow().bold(), failure);
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let name = match input.extension() {
        Some(ext) => format!("{}.optimized.{}", stem, ext.to_string_lossy()),
        None => format!("{}.optimized.pptx", stem),
    };
    input.with_file_name(name)
}

fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes >= KB * KB {
        format!("{:.1} MB", bytes / (KB * KB))
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn print_version() {
    println!("{} {}", "pptslim".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("PowerPoint package size reduction");
    println!();
    println!("Supported formats: PPTX, PPTM, PPSX, PPSM, POTX, POTM");
    println!("Repository: https://github.com/iyulab/pptslim");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(args: &[&str]) -> Tuning {
        let mut argv = vec!["pptslim", "optimize", "deck.pptx"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Optimize { tuning, .. } => tuning,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cli_parse() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_preset_defaults() {
        let options = tuning(&[]).to_options().unwrap();
        assert_eq!(options, OptimizeOptions::from_preset(OptimizePreset::Standard));
    }

    #[test]
    fn test_flags_override_preset() {
        let options = tuning(&["--preset", "minimal", "--remove-hidden", "--quality", "0.4", "--level", "0"])
            .to_options()
            .unwrap();
        assert!(options.remove_hidden_slides);
        assert_eq!(options.compression_level, 0);
        let compress = options.compress_images.unwrap();
        assert_eq!(compress.quality, 0.4);
        assert_eq!(compress.max_width, CompressOptions::default().max_width);
    }

    #[test]
    fn test_no_compress() {
        let options = tuning(&["--no-compress"]).to_options().unwrap();
        assert!(options.compress_images.is_none());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(tuning(&["--quality", "1.5"]).to_options().is_err());
        assert!(Cli::try_parse_from(["pptslim", "optimize", "a.pptx", "--level", "10"]).is_err());
        assert!(
            Cli::try_parse_from(["pptslim", "optimize", "a.pptx", "--compress", "--no-compress"]).is_err()
        );
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.json");
        fs::write(&config, r#"{"removeHiddenSlides":true,"compressionLevel":3}"#).unwrap();

        let options = tuning(&["--config", config.to_str().unwrap(), "--remove-unused"])
            .to_options()
            .unwrap();
        assert!(options.remove_hidden_slides);
        assert!(options.remove_unused_media);
        assert_eq!(options.compression_level, 3);
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("talks/deck.pptm")),
            PathBuf::from("talks/deck.optimized.pptm")
        );
        assert_eq!(default_output(Path::new("deck")), PathBuf::from("deck.optimized.pptx"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
