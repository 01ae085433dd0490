//! Perceptual duplicate detection
//!
//! Samples one frame per planned clip, hashes it, and reports clip pairs
//! whose hashes are within a Hamming distance threshold. Runs on clip plans
//! only and never feeds back into coverage resolution.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use serde::Serialize;

use crate::error::{ExportError, Result, ToolError};
use crate::plan::ClipPlan;

/// Source of still frames
pub trait FrameSampler {
    /// PNG bytes of the frame `at_secs` into `source`
    fn sample_png(&self, source: &Path, at_secs: f64) -> std::result::Result<Vec<u8>, ToolError>;
}

/// Hash of one clip's sampled frame
#[derive(Debug, Clone)]
pub struct ClipFingerprint {
    /// Human readable clip label, e.g. `group2#1`
    pub label: String,
    pub source: PathBuf,
    pub at_secs: f64,
    pub hash: ImageHash,
}

/// Two clips that look alike
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicatePair {
    pub first: String,
    pub second: String,
    pub distance: u32,
}

/// Perceptual hash of a PNG image
pub fn fingerprint_png(png: &[u8], hash_size: u32) -> Result<ImageHash> {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| ExportError::FrameHash(e.to_string()))?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(hash_size, hash_size)
        .to_hasher();
    Ok(hasher.hash_image(&img))
}

/// Fingerprint the midpoint of every plan; `label` names each clip.
///
/// Clips whose frame cannot be sampled or decoded are skipped with a warning.
pub fn fingerprint_plans<'a, I, F>(
    plans: I,
    sampler: &dyn FrameSampler,
    hash_size: u32,
    label: F,
) -> Vec<ClipFingerprint>
where
    I: IntoIterator<Item = &'a ClipPlan>,
    F: Fn(&ClipPlan) -> String,
{
    let mut prints = Vec::new();
    for plan in plans {
        let at_secs = plan.midpoint_secs();
        let png = match sampler.sample_png(&plan.source.path, at_secs) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("No frame for {}: {}", plan.source.display_name(), e);
                continue;
            }
        };
        match fingerprint_png(&png, hash_size) {
            Ok(hash) => prints.push(ClipFingerprint {
                label: label(plan),
                source: plan.source.path.clone(),
                at_secs,
                hash,
            }),
            Err(e) => tracing::warn!("Could not hash frame of {}: {}", plan.source.display_name(), e),
        }
    }
    prints
}

/// All pairs whose distance is at most `threshold`, closest first
pub fn find_duplicates(prints: &[ClipFingerprint], threshold: u32) -> Vec<DuplicatePair> {
    let mut pairs = Vec::new();
    for (i, a) in prints.iter().enumerate() {
        for b in &prints[i + 1..] {
            let distance = a.hash.dist(&b.hash);
            if distance <= threshold {
                tracing::debug!("{} looks like {} (distance {})", a.label, b.label, distance);
                pairs.push(DuplicatePair {
                    first: a.label.clone(),
                    second: b.label.clone(),
                    distance,
                });
            }
        }
    }
    pairs.sort_by_key(|p| p.distance);
    pairs
}
