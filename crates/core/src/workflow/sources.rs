//! Pluggable randomness for the simulator.
//!
//! The defaults draw from `rand`; tests and demos can substitute fixed
//! delays and scripted outcomes.

use crate::types::{NodeId, NodeStatus, WorkflowNode};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

/// Result of simulating one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl From<Outcome> for NodeStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => NodeStatus::Success,
            Outcome::Error => NodeStatus::Error,
        }
    }
}

/// Decides whether a simulated node succeeds
pub trait OutcomeSource: Send + Sync {
    fn draw(&self, node: &WorkflowNode) -> Outcome;
}

/// Decides how long a simulated node runs
pub trait DelaySource: Send + Sync {
    fn delay(&self, node: &WorkflowNode) -> Duration;
}

/// Success rate used when none, or an unusable one, is configured
pub const DEFAULT_SUCCESS_RATE: f64 = 0.9;

/// Biased coin flip
pub struct RandomOutcome {
    success_rate: f64,
}

impl RandomOutcome {
    /// Rates outside `[0, 1]` are clamped; non-finite rates fall back to
    /// [`DEFAULT_SUCCESS_RATE`]
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            tracing::warn!(
                "Ignoring success rate {}, using {}",
                success_rate,
                DEFAULT_SUCCESS_RATE
            );
            DEFAULT_SUCCESS_RATE
        };

        Self { success_rate }
    }
}

impl OutcomeSource for RandomOutcome {
    fn draw(&self, _node: &WorkflowNode) -> Outcome {
        if rand::rng().random_bool(self.success_rate) {
            Outcome::Success
        } else {
            Outcome::Error
        }
    }
}

/// Uniformly distributed delay within `[min, max]`
pub struct UniformDelay {
    min_ms: u64,
    max_ms: u64,
}

impl UniformDelay {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }
}

impl DelaySource for UniformDelay {
    fn delay(&self, _node: &WorkflowNode) -> Duration {
        Duration::from_millis(rand::rng().random_range(self.min_ms..=self.max_ms))
    }
}

/// Same delay for every node
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn delay(&self, _node: &WorkflowNode) -> Duration {
        self.0
    }
}

/// Per-node outcomes chosen up front; unlisted nodes get the default
pub struct ScriptedOutcomes {
    outcomes: HashMap<NodeId, Outcome>,
    default: Outcome,
}

impl ScriptedOutcomes {
    pub fn new(default: Outcome) -> Self {
        Self {
            outcomes: HashMap::new(),
            default,
        }
    }

    pub fn always_succeed() -> Self {
        Self::new(Outcome::Success)
    }

    pub fn with(mut self, node_id: NodeId, outcome: Outcome) -> Self {
        self.outcomes.insert(node_id, outcome);
        self
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn draw(&self, node: &WorkflowNode) -> Outcome {
        self.outcomes.get(&node.id).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeCategory, NodeType, Point};
    use std::sync::Arc;

    fn node() -> WorkflowNode {
        WorkflowNode::new(
            Arc::new(NodeType {
                id: "slack".to_string(),
                name: "Slack".to_string(),
                category: NodeCategory::Messaging,
                icon: "MessageSquare".to_string(),
                description: String::new(),
                inputs: 1,
                outputs: 1,
                config: vec![],
            }),
            Point::ORIGIN,
        )
    }

    #[test]
    fn test_uniform_delay_stays_in_window() {
        let source = UniformDelay::new(500, 1500);
        let node = node();

        for _ in 0..200 {
            let delay = source.delay(&node);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }

        // swapped bounds are normalized
        let swapped = UniformDelay::new(30, 10);
        assert!(swapped.delay(&node) <= Duration::from_millis(30));
    }

    #[test]
    fn test_random_outcome_extremes() {
        let node = node();

        assert_eq!(RandomOutcome::new(1.0).draw(&node), Outcome::Success);
        assert_eq!(RandomOutcome::new(0.0).draw(&node), Outcome::Error);
        assert_eq!(RandomOutcome::new(7.0).draw(&node), Outcome::Success);
    }

    #[test]
    fn test_non_finite_rate_uses_default() {
        let node = node();

        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let source = RandomOutcome::new(rate);
            assert_eq!(source.success_rate, DEFAULT_SUCCESS_RATE);
            // must not panic
            source.draw(&node);
        }
    }

    #[test]
    fn test_scripted_outcomes() {
        let failing = node();
        let passing = node();
        let source = ScriptedOutcomes::always_succeed().with(failing.id.clone(), Outcome::Error);

        assert_eq!(source.draw(&failing), Outcome::Error);
        assert_eq!(source.draw(&passing), Outcome::Success);
        assert_eq!(NodeStatus::from(Outcome::Error), NodeStatus::Error);
    }
}
