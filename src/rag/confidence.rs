//! Confidence scoring for composed answers.

use super::CompositionMethod;
use crate::config::ConfidenceSettings;
use crate::vector_store::RetrievedMatch;

/// Turns retrieval scores and the composition method into a confidence in [0, 1].
///
/// The top match's similarity is the base signal. Other matches at or above
/// `support_floor` corroborate it and can add up to `support_bonus` of the headroom
/// between the top score and 1, so the result never drops below the top score and
/// weak filler never counts. Extractive answers are then discounted, and no-evidence
/// answers always score 0.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    settings: ConfidenceSettings,
}

impl ConfidenceScorer {
    pub fn new(settings: ConfidenceSettings) -> Self {
        Self { settings }
    }

    /// Score an answer composed from `matches` with `method`.
    pub fn score(&self, matches: &[RetrievedMatch], method: CompositionMethod) -> f32 {
        if method == CompositionMethod::NoEvidence || matches.is_empty() {
            return 0.0;
        }

        let retrieval = self.retrieval_signal(matches);
        let adjusted = match method {
            CompositionMethod::Extractive => retrieval * self.settings.extractive_discount,
            _ => retrieval,
        };

        round2(adjusted.clamp(0.0, 1.0))
    }

    fn retrieval_signal(&self, matches: &[RetrievedMatch]) -> f32 {
        let top = matches
            .iter()
            .map(|m| m.score)
            .fold(f32::NEG_INFINITY, f32::max)
            .clamp(0.0, 1.0);

        let supporting = matches
            .iter()
            .filter(|m| m.score >= self.settings.support_floor)
            .count();
        let support = supporting as f32 / matches.len() as f32;

        let bonus = self.settings.support_bonus.clamp(0.0, 1.0);
        top + bonus * support * (1.0 - top)
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::Chunk;

    fn matches(scores: &[f32]) -> Vec<RetrievedMatch> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| RetrievedMatch {
                chunk: Chunk::new("c1", i.to_string(), "Doc", None, "doc.md", "text", vec![1.0]),
                score,
            })
            .collect()
    }

    #[test]
    fn test_no_evidence_is_zero() {
        let scorer = ConfidenceScorer::default();
        assert_eq!(scorer.score(&matches(&[0.9]), CompositionMethod::NoEvidence), 0.0);
        assert_eq!(scorer.score(&[], CompositionMethod::Generative), 0.0);
    }

    #[test]
    fn test_known_values() {
        let scorer = ConfidenceScorer::default();
        // 0.6 + 0.25 * (2 / 3) * 0.4
        let generative = scorer.score(&matches(&[0.6, 0.4, 0.1]), CompositionMethod::Generative);
        assert!((generative - 0.67).abs() < 1e-6, "got {generative}");

        let extractive = scorer.score(&matches(&[0.6, 0.4, 0.1]), CompositionMethod::Extractive);
        assert!((extractive - 0.57).abs() < 1e-6, "got {extractive}");
    }

    #[test]
    fn test_never_below_top_score() {
        let scorer = ConfidenceScorer::default();
        for scores in [&[0.8][..], &[0.8, 0.05], &[0.8, 0.05, 0.01, 0.0], &[0.8, 0.8, 0.8]] {
            let conf = scorer.score(&matches(scores), CompositionMethod::Generative);
            assert!(conf >= 0.8, "{scores:?} gave {conf}");
        }
    }

    #[test]
    fn test_filler_does_not_raise_confidence() {
        let scorer = ConfidenceScorer::default();
        let alone = scorer.score(&matches(&[0.7]), CompositionMethod::Generative);
        let padded = scorer.score(&matches(&[0.7, 0.05, 0.02]), CompositionMethod::Generative);
        assert!(padded <= alone, "{padded} > {alone}");
    }

    #[test]
    fn test_exact_single_match_is_confident() {
        let scorer = ConfidenceScorer::default();
        let generative = scorer.score(&matches(&[1.0]), CompositionMethod::Generative);
        let extractive = scorer.score(&matches(&[1.0]), CompositionMethod::Extractive);
        assert!((generative - 1.0).abs() < 1e-6, "got {generative}");
        assert!((extractive - 0.85).abs() < 1e-6, "got {extractive}");
    }

    #[test]
    fn test_extractive_is_lower_but_nonzero() {
        let scorer = ConfidenceScorer::default();
        let m = matches(&[0.8, 0.3, 0.1]);
        let generative = scorer.score(&m, CompositionMethod::Generative);
        let extractive = scorer.score(&m, CompositionMethod::Extractive);
        assert!(extractive < generative);
        assert!(extractive > 0.0);
    }

    #[test]
    fn test_monotonic_in_top_score() {
        let scorer = ConfidenceScorer::default();
        let mut previous = 0.0;
        for step in 0..=20 {
            let top = 0.2 + step as f32 * 0.04;
            let conf = scorer.score(&matches(&[top, 0.2, 0.1]), CompositionMethod::Generative);
            assert!(conf >= previous, "confidence dropped at top={top}");
            assert!((0.0..=1.0).contains(&conf));
            previous = conf;
        }
    }

    #[test]
    fn test_weak_fallback_scores_stay_low() {
        let scorer = ConfidenceScorer::default();
        let conf = scorer.score(&matches(&[0.15, 0.05]), CompositionMethod::Extractive);
        assert!(conf < 0.55);
    }
}
