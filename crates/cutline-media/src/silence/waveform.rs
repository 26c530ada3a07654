//! Display waveform generation.

/// Map a level in dB onto `[0, 1]`, with the floor at 0 and 0 dB at 1.
#[inline]
pub fn normalize_level(level_db: f32, floor_db: f32) -> f32 {
    if floor_db >= 0.0 || !level_db.is_finite() {
        return 0.0;
    }
    ((level_db - floor_db) / -floor_db).clamp(0.0, 1.0)
}

/// Downsample frame levels to exactly `points` normalized values.
///
/// Longer inputs are block averaged; shorter ones are linearly
/// interpolated. An empty input yields an empty waveform.
pub fn downsample_waveform(levels: &[f32], floor_db: f32, points: usize) -> Vec<f32> {
    if levels.is_empty() || points == 0 {
        return Vec::new();
    }

    let normalized: Vec<f32> = levels.iter().map(|&l| normalize_level(l, floor_db)).collect();
    let n = normalized.len();

    if n >= points {
        return (0..points)
            .map(|b| {
                let start = b * n / points;
                let end = ((b + 1) * n / points).max(start + 1);
                let block = &normalized[start..end];
                block.iter().sum::<f32>() / block.len() as f32
            })
            .collect();
    }

    if n == 1 {
        return vec![normalized[0]; points];
    }

    let span = (n - 1) as f64;
    let steps = (points - 1).max(1) as f64;
    (0..points)
        .map(|j| {
            let x = j as f64 * span / steps;
            let i = (x.floor() as usize).min(n - 2);
            let frac = (x - i as f64) as f32;
            normalized[i] + (normalized[i + 1] - normalized[i]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(-60.0, -60.0), 0.0);
        assert_eq!(normalize_level(0.0, -60.0), 1.0);
        assert!((normalize_level(-30.0, -60.0) - 0.5).abs() < 1e-6);
        assert_eq!(normalize_level(f32::NAN, -60.0), 0.0);
    }

    #[test]
    fn test_block_average_exact_length() {
        let levels: Vec<f32> = (0..4000).map(|i| if i % 2 == 0 { 0.0 } else { -60.0 }).collect();
        let waveform = downsample_waveform(&levels, -60.0, 1000);

        assert_eq!(waveform.len(), 1000);
        assert!(waveform.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_uneven_blocks_cover_input() {
        let levels = vec![-30.0f32; 1001];
        let waveform = downsample_waveform(&levels, -60.0, 1000);
        assert_eq!(waveform.len(), 1000);
        assert!(waveform.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_interpolates_short_input() {
        let waveform = downsample_waveform(&[-60.0, 0.0], -60.0, 5);
        assert_eq!(waveform.len(), 5);
        assert_eq!(waveform[0], 0.0);
        assert!((waveform[2] - 0.5).abs() < 1e-6);
        assert_eq!(waveform[4], 1.0);
    }

    #[test]
    fn test_single_level_repeats() {
        let waveform = downsample_waveform(&[-30.0], -60.0, 4);
        assert_eq!(waveform.len(), 4);
        assert!(waveform.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_empty_input() {
        assert!(downsample_waveform(&[], -60.0, 1000).is_empty());
    }
}
