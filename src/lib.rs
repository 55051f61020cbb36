//! # pptslim
//!
//! Size reduction for PowerPoint packages.
//!
//! A pass over a `.pptx` (or `.pptm`, `.ppsx`, `.potx` and their
//! macro-enabled variants) can drop hidden slides, re-encode oversized
//! raster images, and delete or stub out media that no remaining part
//! references. Every XML part it rewrites goes through a sanitize and
//! validate gate before it is stored, and relationships and content-type
//! overrides are pruned to match the parts that are left.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pptslim::{optimize_file, CompressOptions, OptimizeOptions};
//!
//! let options = OptimizeOptions::new()
//!     .with_remove_hidden_slides(true)
//!     .with_compress_images(CompressOptions::default().with_quality(0.6))
//!     .with_remove_unused_media(true);
//!
//! let report = optimize_file("deck.pptx", "deck.small.pptx", &options)?;
//! println!("{:.1}% smaller", report.reduction_percent());
//! # Ok::<(), pptslim::Error>(())
//! ```
//!
//! ## Never lose the input
//!
//! ```no_run
//! use pptslim::{OptimizeOptions, Optimizer, Outcome};
//!
//! let input = std::fs::read("deck.pptx")?;
//! match Optimizer::new(OptimizeOptions::default()).optimize_or_original(input) {
//!     Outcome::Optimized(done) => std::fs::write("out.pptx", done.data)?,
//!     Outcome::Original { data, error } => {
//!         eprintln!("kept the original: {error}");
//!         std::fs::write("out.pptx", data)?;
//!     }
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! ## Features
//!
//! - `async`: `optimize_file_async` on top of Tokio
//! - `ffi`: C-ABI bindings for foreign language integration

pub mod container;
pub mod detect;
pub mod error;
pub mod inspect;
pub mod media;
pub mod optimizer;
pub mod options;
pub mod pptx;
pub mod rels;
pub mod xml;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-exports
pub use container::{ArchiveOptions, Package};
pub use detect::{detect_format_from_bytes, detect_format_from_path, FormatType};
pub use error::{Error, Result};
pub use inspect::{inspect_bytes, inspect_file, PackageSummary};
pub use media::{ImageCodec, MediaAction, MediaKind, RasterCodec, TargetFormat};
pub use optimizer::{Optimized, Optimizer, Outcome, Report};
pub use options::{CompressOptions, OptimizeOptions, OptimizePreset};
pub use rels::{Relationship, Relationships};

use std::path::Path;

/// Optimize a package held in memory.
///
/// # Example
///
/// ```no_run
/// use pptslim::{optimize_bytes, OptimizeOptions, OptimizePreset};
///
/// let data = std::fs::read("deck.pptx")?;
/// let optimized = optimize_bytes(&data, &OptimizeOptions::from_preset(OptimizePreset::Aggressive))?;
/// std::fs::write("deck.small.pptx", &optimized.data)?;
/// # Ok::<(), pptslim::Error>(())
/// ```
pub fn optimize_bytes(data: &[u8], options: &OptimizeOptions) -> Result<Optimized> {
    Optimizer::new(options.clone()).optimize(data)
}

/// Optimize `input` and write the result to `output`.
///
/// Nothing is written when the pass fails. `input` and `output` may name
/// the same file.
pub fn optimize_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &OptimizeOptions,
) -> Result<Report> {
    let data = std::fs::read(input.as_ref())?;
    let optimized = optimize_bytes(&data, options)?;
    std::fs::write(output.as_ref(), &optimized.data)?;
    Ok(optimized.report)
}

/// Async variant of [`optimize_file`].
///
/// File I/O uses Tokio; the pass itself runs on the blocking pool.
#[cfg(feature = "async")]
pub async fn optimize_file_async(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &OptimizeOptions,
) -> Result<Report> {
    let data = tokio::fs::read(input.as_ref()).await?;
    let optimizer = Optimizer::new(options.clone());
    let optimized = tokio::task::spawn_blocking(move || optimizer.optimize(&data))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;
    tokio::fs::write(output.as_ref(), &optimized.data).await?;
    Ok(optimized.report)
}
