//! The optimization pass.
//!
//! An [`Optimizer`] holds configuration and the image codec only. Each call
//! to [`Optimizer::optimize`] loads its own [`Package`], runs every step
//! against it and serializes it once at the end. A fatal error anywhere
//! discards the package, so callers never see a half-rewritten archive.

use crate::container::Package;
use crate::detect::detect_package_format;
use crate::error::{Error, Result};
use crate::media::{
    choose_action, compress, media_kind_of, placeholder_for, ImageCodec, MediaAction, MediaKind,
    RasterCodec,
};
use crate::options::OptimizeOptions;
use crate::pptx::presentation::{PresentationRewriter, RewriteState};
use crate::pptx::usage::{media_candidates, resolve_media_usage};
use crate::pptx::{content_types, slides};
use crate::rels::prune_dangling;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Size report of one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Input size in bytes
    pub original_size: usize,
    /// Output size in bytes
    pub optimized_size: usize,
    /// Wall time of the pass
    pub elapsed_ms: f64,
    /// Entries removed from the slide list
    pub slides_removed: usize,
    /// Slide, notes and `.rels` parts deleted with them
    pub slide_parts_deleted: usize,
    /// Images replaced by a smaller encoding
    pub images_compressed: usize,
    /// Images kept because re-encoding did not shrink them
    pub images_not_smaller: usize,
    /// Media replaced with placeholders
    pub placeholders_written: usize,
    /// Media entries deleted
    pub media_deleted: usize,
    /// Relationships removed from `.rels` parts
    pub relationships_pruned: usize,
    /// Content-type overrides removed
    pub overrides_pruned: usize,
    /// False when some part could not be scanned for media references
    pub usage_complete: bool,
    /// Recoverable problems, in the order they happened
    pub warnings: Vec<String>,
}

impl Report {
    /// Bytes saved; zero when the output grew.
    pub fn saved_bytes(&self) -> usize {
        self.original_size.saturating_sub(self.optimized_size)
    }

    /// Size reduction in percent of the input.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.optimized_size as f64 / self.original_size as f64) * 100.0
    }

    fn warn(&mut self, err: &Error) {
        self.warnings.push(err.to_string());
    }
}

/// An optimized package and its report.
#[derive(Debug, Clone)]
pub struct Optimized {
    /// Output archive bytes
    pub data: Vec<u8>,
    /// What the pass did
    pub report: Report,
}

/// Result of [`Optimizer::optimize_or_original`].
#[derive(Debug)]
pub enum Outcome {
    /// The pass succeeded
    Optimized(Optimized),
    /// The pass failed; the input is handed back untouched
    Original {
        /// Input bytes
        data: Vec<u8>,
        /// Fatal error that stopped the pass
        error: Error,
    },
}

impl Outcome {
    /// Bytes to use: the optimized archive or the original input.
    pub fn into_data(self) -> Vec<u8> {
        match self {
            Outcome::Optimized(optimized) => optimized.data,
            Outcome::Original { data, .. } => data,
        }
    }

    /// Report of a successful pass.
    pub fn report(&self) -> Option<&Report> {
        match self {
            Outcome::Optimized(optimized) => Some(&optimized.report),
            Outcome::Original { .. } => None,
        }
    }

    /// Fatal error of a failed pass.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Optimized(_) => None,
            Outcome::Original { error, .. } => Some(error),
        }
    }
}

/// Outcome of the work on one media entry.
enum MediaResult {
    Keep,
    Delete,
    Placeholder(Vec<u8>),
    Compressed(Vec<u8>),
    NotSmaller,
    Failed(Error),
}

/// Package optimizer.
///
/// # Example
///
/// ```no_run
/// use pptslim::{CompressOptions, OptimizeOptions, Optimizer};
///
/// let options = OptimizeOptions::new()
///     .with_remove_hidden_slides(true)
///     .with_compress_images(CompressOptions::default())
///     .with_remove_unused_media(true);
/// let input = std::fs::read("deck.pptx")?;
/// let optimized = Optimizer::new(options).optimize(&input)?;
/// std::fs::write("deck.optimized.pptx", &optimized.data)?;
/// println!("saved {} bytes", optimized.report.saved_bytes());
/// # Ok::<(), pptslim::Error>(())
/// ```
#[derive(Clone)]
pub struct Optimizer {
    options: OptimizeOptions,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizeOptions::default())
    }
}

impl Optimizer {
    /// Create an optimizer using the built-in raster codec.
    pub fn new(options: OptimizeOptions) -> Self {
        Self::with_codec(options, Arc::new(RasterCodec))
    }

    /// Create an optimizer with a custom image codec.
    pub fn with_codec(options: OptimizeOptions, codec: Arc<dyn ImageCodec>) -> Self {
        Self { options, codec }
    }

    /// Options of this optimizer.
    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    /// Optimize a package, handing the input back on a fatal error.
    pub fn optimize_or_original(&self, data: Vec<u8>) -> Outcome {
        match self.optimize(&data) {
            Ok(optimized) => Outcome::Optimized(optimized),
            Err(error) => {
                tracing::warn!(%error, "optimization failed; returning the original package");
                Outcome::Original { data, error }
            }
        }
    }

    /// Optimize a package.
    pub fn optimize(&self, data: &[u8]) -> Result<Optimized> {
        let started = Instant::now();
        self.options.validate()?;

        let mut package = Package::from_bytes(data)?;
        let format = detect_package_format(&package)?;
        tracing::debug!(%format, entries = package.len(), "optimizing package");

        let mut report = Report {
            original_size: data.len(),
            ..Default::default()
        };

        let mut rewriter = PresentationRewriter::load(&package)?;
        if self.options.remove_hidden_slides
            && rewriter.filter_hidden() == &RewriteState::Aborted
        {
            report
                .warnings
                .push("every slide is hidden; slide list left unchanged".to_string());
        }

        let groups = slides::removable_groups(&package, rewriter.dropped());
        let linked = slides::still_linked(&package, rewriter.dropped(), &groups);
        if !linked.is_empty() {
            tracing::debug!(slides = linked.len(), "hidden slides still linked; keeping them listed");
            rewriter.keep_listed(&linked);
        }
        let group_parts = slides::group_parts(&groups);

        let usage = resolve_media_usage(&package, &group_parts);
        report.usage_complete = usage.is_complete();
        for err in &usage.failures {
            report.warn(err);
        }
        if self.options.remove_unused_media && !usage.is_complete() {
            tracing::warn!("media usage is incomplete; unused media is kept");
            report
                .warnings
                .push("media usage is incomplete; unused media was kept".to_string());
        }

        let plan: Vec<(String, MediaKind, MediaAction)> = media_candidates(&package)
            .into_iter()
            .filter_map(|path| {
                let kind = media_kind_of(&path)?;
                let action = choose_action(kind, usage.is_used(&path), usage.is_complete(), &self.options);
                (action != MediaAction::Keep).then_some((path, kind, action))
            })
            .collect();

        // One job per media path; results are applied below on this thread
        let results: Vec<(String, MediaResult)> = plan
            .par_iter()
            .map(|(path, kind, action)| {
                let result = self.process_media(&package, path, *kind, *action);
                (path.clone(), result)
            })
            .collect();

        let mut deleted: BTreeSet<String> = BTreeSet::new();
        for (path, result) in results {
            match result {
                MediaResult::Keep => {}
                MediaResult::Delete => {
                    if package.remove(&path) {
                        report.media_deleted += 1;
                        deleted.insert(path);
                    }
                }
                MediaResult::Placeholder(bytes) => {
                    package.write(&path, bytes);
                    report.placeholders_written += 1;
                }
                MediaResult::Compressed(bytes) => {
                    package.write(&path, bytes);
                    report.images_compressed += 1;
                }
                MediaResult::NotSmaller => report.images_not_smaller += 1,
                MediaResult::Failed(err) => {
                    tracing::warn!(error = %err, "media left unchanged");
                    report.warn(&err);
                }
            }
        }

        let summary = rewriter.commit(&mut package)?;
        report.slides_removed = summary.slides_removed;
        report.slide_parts_deleted = slides::delete_groups(&mut package, &groups);
        deleted.extend(group_parts);

        let pruned = prune_dangling(&mut package, &deleted);
        report.relationships_pruned = pruned.removed;
        for err in &pruned.failures {
            report.warn(err);
        }

        report.overrides_pruned = content_types::reconcile(&mut package)?;

        let output = package.serialize(&self.options.archive_options())?;
        report.optimized_size = output.len();
        report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            original = report.original_size,
            optimized = report.optimized_size,
            saved = report.saved_bytes(),
            elapsed_ms = report.elapsed_ms,
            warnings = report.warnings.len(),
            "package optimized"
        );
        Ok(Optimized {
            data: output,
            report,
        })
    }

    fn process_media(
        &self,
        package: &Package,
        path: &str,
        kind: MediaKind,
        action: MediaAction,
    ) -> MediaResult {
        match action {
            MediaAction::Keep => MediaResult::Keep,
            MediaAction::Delete => MediaResult::Delete,
            MediaAction::Placeholder => match placeholder_for(kind) {
                Ok(Some(bytes)) => MediaResult::Placeholder(bytes),
                Ok(None) => {
                    tracing::warn!(media = %path, "no placeholder for metafiles; kept");
                    MediaResult::Keep
                }
                Err(err) => MediaResult::Failed(err.for_media(path)),
            },
            MediaAction::Compress => {
                let (Some(original), Some(compress_options)) =
                    (package.read_binary(path), self.options.compress_images.as_ref())
                else {
                    return MediaResult::Keep;
                };
                match compress(self.codec.as_ref(), original, compress_options) {
                    Ok(compressed) if compressed.data.len() < original.len() => {
                        tracing::debug!(
                            media = %path,
                            before = original.len(),
                            after = compressed.data.len(),
                            "image recompressed"
                        );
                        MediaResult::Compressed(compressed.data)
                    }
                    Ok(_) => MediaResult::NotSmaller,
                    Err(err) => MediaResult::Failed(err.for_media(path)),
                }
            }
        }
    }
}
