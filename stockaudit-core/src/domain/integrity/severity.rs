// stockaudit-core/src/domain/integrity/severity.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// Declaration order gives Good < Warning < Critical, so `max()` over
// sub-report statuses yields the overall worst one.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    #[default]
    Good,
    Warning,
    Critical,
}

impl IntegrityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Status of a sub-report from its issue counts.
    /// `critical_limit` escalates to Critical once the total goes past it.
    pub fn classify(critical: usize, total: usize, critical_limit: usize) -> Self {
        if critical > 0 || total > critical_limit {
            Self::Critical
        } else if total > 0 {
            Self::Warning
        } else {
            Self::Good
        }
    }

    /// Status driven by per-issue severities only.
    pub fn from_counts(critical: usize, total: usize) -> Self {
        Self::classify(critical, total, usize::MAX)
    }
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IntegrityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "good" => Ok(Self::Good),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown integrity status: {}", s)),
        }
    }
}

/// Per-issue severity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four detector categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Orphans,
    Consistency,
    Duplicates,
    BusinessRules,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 4] = [
        Self::Orphans,
        Self::Consistency,
        Self::Duplicates,
        Self::BusinessRules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orphans => "orphans",
            Self::Consistency => "consistency",
            Self::Duplicates => "duplicates",
            Self::BusinessRules => "business_rules",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(IntegrityStatus::Good < IntegrityStatus::Warning);
        assert!(IntegrityStatus::Warning < IntegrityStatus::Critical);
        assert_eq!(IntegrityStatus::default(), IntegrityStatus::Good);
    }

    #[test]
    fn test_classify() {
        assert_eq!(IntegrityStatus::classify(0, 0, 10), IntegrityStatus::Good);
        assert_eq!(IntegrityStatus::classify(0, 3, 10), IntegrityStatus::Warning);
        assert_eq!(IntegrityStatus::classify(1, 3, 10), IntegrityStatus::Critical);
        assert_eq!(IntegrityStatus::classify(0, 11, 10), IntegrityStatus::Critical);
    }

    #[test]
    fn test_display_and_parsing_consistency() -> anyhow::Result<()> {
        use std::str::FromStr;
        assert_eq!(IntegrityStatus::Critical.to_string(), "critical");
        assert_eq!(
            IntegrityStatus::from_str("WARNING").map_err(|e| anyhow::anyhow!(e))?,
            IntegrityStatus::Warning
        );
        assert!(IntegrityStatus::from_str("bad").is_err());
        Ok(())
    }
}
