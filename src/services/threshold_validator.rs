//! Threshold-based goal validator.
//!
//! Checks each success criterion of a goal against measured metrics. Every
//! criterion yields a 0-100 score; the overall score is their mean and the
//! goal is achieved only when every criterion passes.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    ActualMetrics, ConsumptionReport, GapSeverity, Goal, MetricGap, ValidationResult,
};
use crate::domain::ports::GoalValidator;

/// Score lost per unit over an upper bound.
const PENALTY_PER_EXCESS: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
enum Bound {
    AtLeast,
    AtMost,
}

struct Criterion {
    name: &'static str,
    bound: Bound,
    expected: f64,
    actual: f64,
    remedy: &'static str,
}

impl Criterion {
    fn passed(&self) -> bool {
        match self.bound {
            Bound::AtLeast => self.actual >= self.expected,
            Bound::AtMost => self.actual <= self.expected,
        }
    }

    fn score(&self) -> f64 {
        if self.passed() {
            return 100.0;
        }
        match self.bound {
            Bound::AtLeast => (self.actual / self.expected * 100.0).clamp(0.0, 100.0),
            Bound::AtMost => {
                (100.0 - (self.actual - self.expected) * PENALTY_PER_EXCESS).clamp(0.0, 100.0)
            }
        }
    }

    fn gap(&self) -> MetricGap {
        let gap = (self.expected - self.actual).abs();
        let gap_percentage = if self.expected > 0.0 {
            gap / self.expected * 100.0
        } else {
            100.0
        };
        MetricGap {
            metric: self.name.to_string(),
            expected: self.expected,
            actual: self.actual,
            gap,
            gap_percentage,
            severity: gap_severity(gap_percentage),
        }
    }

    fn feedback(&self) -> String {
        let relation = match self.bound {
            Bound::AtLeast => "at least",
            Bound::AtMost => "at most",
        };
        if self.passed() {
            format!("{}: {} meets {} {}", self.name, self.actual, relation, self.expected)
        } else {
            format!("{}: {} but expected {} {}", self.name, self.actual, relation, self.expected)
        }
    }
}

/// Gap severity from the gap as a percentage of the expected value.
pub fn gap_severity(gap_percentage: f64) -> GapSeverity {
    if gap_percentage >= 50.0 {
        GapSeverity::Critical
    } else if gap_percentage >= 25.0 {
        GapSeverity::High
    } else if gap_percentage >= 10.0 {
        GapSeverity::Medium
    } else {
        GapSeverity::Low
    }
}

/// Default `GoalValidator` comparing metrics to the goal's thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdValidator;

impl ThresholdValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Synchronous validation; the port implementation delegates here.
    pub fn evaluate(&self, goal: &Goal, metrics: &ActualMetrics, session_id: &str) -> ConsumptionReport {
        let c = &goal.success_criteria;
        let criteria = [
            Criterion {
                name: "quality_score",
                bound: Bound::AtLeast,
                expected: c.min_quality_score,
                actual: metrics.quality_score,
                remedy: "Address reviewer findings to raise the quality score",
            },
            Criterion {
                name: "lint_errors",
                bound: Bound::AtMost,
                expected: f64::from(c.max_lint_errors),
                actual: f64::from(metrics.lint_errors),
                remedy: "Fix outstanding lint errors",
            },
            Criterion {
                name: "type_errors",
                bound: Bound::AtMost,
                expected: f64::from(c.max_type_errors),
                actual: f64::from(metrics.type_errors),
                remedy: "Resolve type errors",
            },
            Criterion {
                name: "security_issues",
                bound: Bound::AtMost,
                expected: f64::from(c.max_security_issues),
                actual: f64::from(metrics.security_issues),
                remedy: "Remediate reported security issues",
            },
            Criterion {
                name: "test_coverage",
                bound: Bound::AtLeast,
                expected: c.min_test_coverage,
                actual: metrics.test_coverage,
                remedy: "Add tests for uncovered code paths",
            },
            Criterion {
                name: "tests_passed",
                bound: Bound::AtLeast,
                expected: f64::from(c.min_tests_passed),
                actual: f64::from(metrics.tests_passed),
                remedy: "Make failing tests pass or add the missing tests",
            },
        ];

        let mut report = ConsumptionReport::scored(goal.id, session_id, 0.0, true);
        for criterion in &criteria {
            let passed = criterion.passed();
            report.validation_results.push(ValidationResult {
                criterion: criterion.name.to_string(),
                passed,
                expected: criterion.expected,
                actual: criterion.actual,
                score: criterion.score(),
                feedback: criterion.feedback(),
            });
            if !passed {
                report.goal_achieved = false;
                report.gaps.push(criterion.gap());
                report.recommendations.push(criterion.remedy.to_string());
                report
                    .next_actions
                    .push(format!("Bring {} to {}", criterion.name, criterion.expected));
            }
        }

        if metrics.tests_failed > 0 {
            report
                .recommendations
                .push(format!("{} test(s) failing", metrics.tests_failed));
        }

        report.overall_score = report.validation_results.iter().map(|v| v.score).sum::<f64>()
            / report.validation_results.len() as f64;
        report.timestamp = Utc::now();
        report
    }
}

#[async_trait]
impl GoalValidator for ThresholdValidator {
    async fn validate(
        &self,
        goal: &Goal,
        metrics: &ActualMetrics,
        session_id: &str,
    ) -> DomainResult<ConsumptionReport> {
        Ok(self.evaluate(goal, metrics, session_id))
    }
}
