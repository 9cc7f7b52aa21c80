//! Escalation policy.

use super::CompositionMethod;

/// Decides whether an answer should come with an offer of instructor follow-up.
#[derive(Debug, Clone, Copy)]
pub struct EscalationPolicy {
    threshold: f32,
}

impl EscalationPolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Escalate when confidence is below the threshold or nothing supported the answer.
    pub fn should_escalate(&self, confidence: f32, method: CompositionMethod) -> bool {
        method == CompositionMethod::NoEvidence || confidence < self.threshold
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(0.55)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let policy = EscalationPolicy::default();
        assert!(policy.should_escalate(0.54, CompositionMethod::Generative));
        assert!(!policy.should_escalate(0.55, CompositionMethod::Generative));
        assert!(!policy.should_escalate(0.9, CompositionMethod::Extractive));
    }

    #[test]
    fn test_no_evidence_always_escalates() {
        let policy = EscalationPolicy::new(0.0);
        for confidence in [0.0, 0.5, 1.0] {
            assert!(policy.should_escalate(confidence, CompositionMethod::NoEvidence));
        }
    }
}
