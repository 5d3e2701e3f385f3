//! Escalation records routed to human owner roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Severity;

/// Owner role that receives an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscalationTarget {
    /// Technical lead; default for engineering issues
    TechLead,
    /// Product owner
    #[serde(rename = "PO")]
    ProductOwner,
    /// Security officer; critical security findings
    #[serde(rename = "CISO")]
    Ciso,
    /// Chief technology officer
    #[serde(rename = "CTO")]
    Cto,
    /// Operations; deployment problems
    DevOps,
}

impl EscalationTarget {
    /// Role label, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechLead => "TechLead",
            Self::ProductOwner => "PO",
            Self::Ciso => "CISO",
            Self::Cto => "CTO",
            Self::DevOps => "DevOps",
        }
    }
}

impl std::fmt::Display for EscalationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal that automated handling cannot proceed safely.
///
/// Escalations never halt a run; they are delivered and the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    /// Why automated handling stopped
    pub reason: String,
    /// Role that should act
    pub target: EscalationTarget,
    /// How urgent the escalation is
    pub severity: Severity,
    /// Structured details, e.g. cyclic task ids or loop state
    #[serde(default)]
    pub context: serde_json::Value,
    /// When the escalation was raised
    pub timestamp: DateTime<Utc>,
}

impl Escalation {
    /// Create an escalation raised now.
    pub fn new(
        reason: impl Into<String>,
        target: EscalationTarget,
        severity: Severity,
        context: serde_json::Value,
    ) -> Self {
        Self {
            reason: reason.into(),
            target,
            severity,
            context,
            timestamp: Utc::now(),
        }
    }
}
