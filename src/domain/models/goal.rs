//! Goal domain model.
//!
//! A goal is a named set of quantitative success thresholds that an iterative
//! feedback loop must satisfy. Goals are mutated in place only by refinement,
//! which always preserves a snapshot of the goal it replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority level for goals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    /// Nice to have
    Low = 1,
    /// Default priority
    #[default]
    Normal = 2,
    /// Takes precedence over normal goals
    High = 3,
    /// Blocks other work
    Critical = 4,
}

impl GoalPriority {
    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a priority name, case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Numeric thresholds a goal must meet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    /// Minimum aggregate quality score (0-100)
    pub min_quality_score: f64,
    /// Maximum lint errors allowed
    pub max_lint_errors: u32,
    /// Maximum type checker errors allowed
    pub max_type_errors: u32,
    /// Maximum security findings allowed
    pub max_security_issues: u32,
    /// Minimum test coverage percentage
    pub min_test_coverage: f64,
    /// Minimum number of passing tests
    pub min_tests_passed: u32,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self {
            min_quality_score: 80.0,
            max_lint_errors: 0,
            max_type_errors: 0,
            max_security_issues: 0,
            min_test_coverage: 80.0,
            min_tests_passed: 1,
        }
    }
}

/// A test the goal expects to exist and pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Test name
    pub name: String,
    /// What the test checks
    #[serde(default)]
    pub description: String,
    /// Test category, e.g. "unit" or "integration"
    #[serde(default)]
    pub kind: String,
}

impl TestSpec {
    /// Create a test spec with no description.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind: kind.into(),
        }
    }
}

/// A quantitative objective for a feedback loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique goal identifier
    pub id: Uuid,
    /// Short title
    pub title: String,
    /// What the goal is about
    #[serde(default)]
    pub description: String,
    /// Thresholds validated each iteration
    pub success_criteria: SuccessCriteria,
    /// Tests the goal expects
    #[serde(default)]
    pub test_specs: Vec<TestSpec>,
    /// Free-form acceptance criteria
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Goal priority
    pub priority: GoalPriority,
    /// When the goal was created
    pub created_at: DateTime<Utc>,
    /// When the goal was last replaced in the store
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Create a new goal with default success criteria.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            success_criteria: SuccessCriteria::default(),
            test_specs: Vec::new(),
            acceptance_criteria: Vec::new(),
            priority: GoalPriority::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the success criteria.
    pub fn with_criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.success_criteria = criteria;
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: GoalPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Add an expected test.
    pub fn with_test_spec(mut self, spec: TestSpec) -> Self {
        self.test_specs.push(spec);
        self
    }

    /// Add an acceptance criterion.
    pub fn with_acceptance_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.acceptance_criteria.push(criterion.into());
        self
    }

    /// Validate this goal.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Goal title cannot be empty".to_string());
        }
        let criteria = &self.success_criteria;
        if !(0.0..=100.0).contains(&criteria.min_quality_score) {
            return Err(format!(
                "min_quality_score must be within 0-100, got {}",
                criteria.min_quality_score
            ));
        }
        if !(0.0..=100.0).contains(&criteria.min_test_coverage) {
            return Err(format!(
                "min_test_coverage must be within 0-100, got {}",
                criteria.min_test_coverage
            ));
        }
        Ok(())
    }
}

/// Builder for creating goals with a fluent API.
#[derive(Debug, Default)]
pub struct GoalBuilder {
    title: Option<String>,
    description: Option<String>,
    criteria: SuccessCriteria,
    priority: GoalPriority,
    test_specs: Vec<TestSpec>,
    acceptance_criteria: Vec<String>,
}

impl GoalBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title. Required.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the minimum quality score.
    pub fn min_quality_score(mut self, score: f64) -> Self {
        self.criteria.min_quality_score = score;
        self
    }

    /// Set the minimum test coverage.
    pub fn min_test_coverage(mut self, coverage: f64) -> Self {
        self.criteria.min_test_coverage = coverage;
        self
    }

    /// Replace all success criteria.
    pub fn criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: GoalPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Add an expected test.
    pub fn test_spec(mut self, spec: TestSpec) -> Self {
        self.test_specs.push(spec);
        self
    }

    /// Add an acceptance criterion.
    pub fn acceptance_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.acceptance_criteria.push(criterion.into());
        self
    }

    /// Build and validate the goal.
    pub fn build(self) -> Result<Goal, String> {
        let title = self.title.ok_or("Goal title is required")?;
        let description = self.description.unwrap_or_default();

        let mut goal = Goal::new(title, description)
            .with_criteria(self.criteria)
            .with_priority(self.priority);
        goal.test_specs = self.test_specs;
        goal.acceptance_criteria = self.acceptance_criteria;

        goal.validate()?;
        Ok(goal)
    }
}

/// One field adjusted by a refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementChange {
    /// Dotted field path, e.g. `success_criteria.min_quality_score`
    pub field: String,
    /// Value before the refinement
    pub before: serde_json::Value,
    /// Value after the refinement
    pub after: serde_json::Value,
    /// Why the field changed
    pub reason: String,
}

/// Audited record of an automatic goal adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRefinement {
    /// When the refinement was made
    pub timestamp: DateTime<Utc>,
    /// What triggered the refinement
    pub reason: String,
    /// Goal before the refinement
    pub original_goal: Goal,
    /// Goal after the refinement
    pub refined_goal: Goal,
    /// Individual field changes; may be empty
    pub changes: Vec<RefinementChange>,
    /// Expected effect on the next iterations
    pub expected_impact: String,
}
