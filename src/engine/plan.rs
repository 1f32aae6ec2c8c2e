//! Pure parameter planning: reduction percentage in, encode parameters out.
//!
//! The formulas are deliberately simple heuristics; output compatibility
//! matters more here than perceptual accuracy, so they are kept as-is.

use super::types::{EncodeJob, EncodePlan, Mode};

/// Fixed audio allowance subtracted from the total bitrate budget (kbps);
/// audio is always re-encoded at this rate.
const AUDIO_KBPS: f64 = 128.0;

/// Planned video bitrate never drops below this (kbps).
const MIN_VIDEO_KBPS: f64 = 100.0;

/// Returned when the duration is unusable. Estimation must never block a
/// job, so a bad duration yields a conservative constant instead of an error.
const FALLBACK_KBPS: u32 = 300;

/// Reduction presets offered by front-ends, with the snap tolerance to match.
pub const REDUCTION_PRESETS: &[u32] = &[10, 20, 30, 40, 50];
pub const SNAP_TOLERANCE: u32 = 2;

/// CRF for quality mode: 23 at 5% reduction up to 32 at 80%, linear and
/// truncated. Total over the working range, but defined for any input.
pub fn estimate_crf(reduction: u32) -> u32 {
    (23.0 + (reduction as f64 / 100.0) * 12.0) as u32
}

/// Video bitrate (kbps) that should land the output near the target size:
/// byte budget over duration, minus the audio allowance, floored at
/// [`MIN_VIDEO_KBPS`] and finally clamped to the source's own average
/// bitrate so the plan never requests more data than the original carries.
pub fn plan_bitrate(reduction: u32, duration_s: f64, source_size: u64) -> u32 {
    if !duration_s.is_finite() || duration_s <= 0.0 {
        return FALLBACK_KBPS;
    }

    let target_bytes = source_size as f64 * (1.0 - reduction as f64 / 100.0);
    let total_kbps = target_bytes * 8.0 / duration_s / 1000.0;
    let video_kbps = (total_kbps - AUDIO_KBPS).max(MIN_VIDEO_KBPS) as u32;

    let source_kbps = (source_size as f64 * 8.0 / duration_s / 1000.0) as u32;
    video_kbps.min(source_kbps)
}

/// Derive the plan for a probed job.
pub fn plan_for(job: &EncodeJob) -> EncodePlan {
    match job.mode {
        Mode::Quality => EncodePlan::Crf(estimate_crf(job.reduction)),
        Mode::Size => EncodePlan::Bitrate {
            video_kbps: plan_bitrate(job.reduction, job.duration_s.unwrap_or(0.0), job.source_size),
        },
    }
}

/// Snap `value` to the first preset within `tolerance`, or return it
/// unchanged. Front-end convenience, kept out of the planning math.
pub fn snap(value: u32, presets: &[u32], tolerance: u32) -> u32 {
    for &preset in presets {
        if value.abs_diff(preset) <= tolerance {
            return preset;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crf_endpoints_follow_the_formula() {
        assert_eq!(estimate_crf(5), 23);
        assert_eq!(estimate_crf(20), 25);
        assert_eq!(estimate_crf(50), 29);
        assert_eq!(estimate_crf(80), 32);
    }

    #[test]
    fn crf_tolerates_out_of_range_input() {
        assert_eq!(estimate_crf(0), 23);
        assert_eq!(estimate_crf(100), 35);
        assert!(estimate_crf(u32::MAX) >= 23);
    }

    #[test]
    fn bitrate_for_the_reference_scenario() {
        // 100 MiB over 100 s at 50% reduction: 52428800 bytes of budget is
        // 4194.3 kbps total, minus audio and truncated.
        let kbps = plan_bitrate(50, 100.0, 100 * 1024 * 1024);
        assert_eq!(kbps, 4066);
    }

    #[test]
    fn bitrate_is_floored_before_the_source_clamp() {
        // Tiny budget: 1 MiB source, 60 s. Total kbps is far below the audio
        // allowance, so the floor kicks in first, then the source average
        // (139 kbps) leaves it at 100.
        let kbps = plan_bitrate(80, 60.0, 1024 * 1024);
        assert_eq!(kbps, 100);
    }

    #[test]
    fn bitrate_never_exceeds_source_average() {
        // 5% reduction on a short clip: the naive budget is close to the
        // source average; the clamp keeps it at or below it.
        let source_size = 10 * 1024 * 1024;
        let kbps = plan_bitrate(5, 30.0, source_size);
        let source_kbps = (source_size as f64 * 8.0 / 30.0 / 1000.0) as u32;
        assert!(kbps <= source_kbps);
    }

    #[test]
    fn bad_duration_falls_back_instead_of_failing() {
        assert_eq!(plan_bitrate(50, 0.0, 1_000_000), 300);
        assert_eq!(plan_bitrate(50, -1.0, 1_000_000), 300);
        assert_eq!(plan_bitrate(50, f64::NAN, 1_000_000), 300);
    }

    #[test]
    fn snap_matches_nearby_presets_only() {
        assert_eq!(snap(19, REDUCTION_PRESETS, SNAP_TOLERANCE), 20);
        assert_eq!(snap(22, REDUCTION_PRESETS, SNAP_TOLERANCE), 20);
        assert_eq!(snap(25, REDUCTION_PRESETS, SNAP_TOLERANCE), 25);
        assert_eq!(snap(50, REDUCTION_PRESETS, SNAP_TOLERANCE), 50);
        assert_eq!(snap(77, REDUCTION_PRESETS, SNAP_TOLERANCE), 77);
    }
}
