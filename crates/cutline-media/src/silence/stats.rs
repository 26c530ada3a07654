//! Summary statistics for an analysis.

use cutline_models::{AnalysisStatistics, SilenceSegment, SpeechSegment};

/// Aggregate segment lists into the reported statistics.
pub fn compute_statistics(
    duration: f64,
    silence: &[SilenceSegment],
    speech: &[SpeechSegment],
    clip_count: usize,
) -> AnalysisStatistics {
    let total_silence_duration: f64 = silence.iter().map(|s| s.duration).sum();

    let (time_saved_percentage, speech_ratio) = if duration > 0.0 {
        (
            total_silence_duration / duration * 100.0,
            (1.0 - total_silence_duration / duration).clamp(0.0, 1.0),
        )
    } else {
        (0.0, 1.0)
    };

    AnalysisStatistics {
        total_silence_duration,
        time_saved_percentage,
        new_duration: (duration - total_silence_duration).max(0.0),
        silence_segment_count: silence.len(),
        speech_segment_count: speech.len(),
        clip_count,
        speech_ratio,
        estimated_cuts: silence.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let silence = [
            SilenceSegment::new(2.0, 4.0, 1.0),
            SilenceSegment::new(6.0, 8.0, 1.0),
        ];
        let speech = [
            SpeechSegment::new(0.0, 2.0),
            SpeechSegment::new(4.0, 6.0),
            SpeechSegment::new(8.0, 10.0),
        ];

        let stats = compute_statistics(10.0, &silence, &speech, 5);
        assert_eq!(stats.total_silence_duration, 4.0);
        assert!((stats.time_saved_percentage - 40.0).abs() < 1e-9);
        assert_eq!(stats.new_duration, 6.0);
        assert_eq!(stats.silence_segment_count, 2);
        assert_eq!(stats.speech_segment_count, 3);
        assert_eq!(stats.clip_count, 5);
        assert!((stats.speech_ratio - 0.6).abs() < 1e-9);
        assert_eq!(stats.estimated_cuts, 2);
    }

    #[test]
    fn test_zero_duration() {
        let stats = compute_statistics(0.0, &[], &[], 0);
        assert_eq!(stats.time_saved_percentage, 0.0);
        assert_eq!(stats.new_duration, 0.0);
        assert_eq!(stats.speech_ratio, 1.0);
    }
}
