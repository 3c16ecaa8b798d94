use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Moderate,
    NoGap,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Moderate => "moderate",
            Severity::NoGap => "no_gap",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub role_id: Uuid,
    pub skill_id: String,
    pub skill_name: String,
    pub family_id: String,
    pub family_name: String,
    pub required_level: i32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub assessment_id: i64,
    pub skill_id: String,
    pub score: i32,
}

/// One requirement classified against the achieved score. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillGap {
    pub skill_id: String,
    pub skill_name: String,
    pub family_name: String,
    pub required_level: i32,
    /// 0 when the skill was left unanswered.
    pub achieved_score: i32,
    pub weight: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleGapSummary {
    pub role_id: Uuid,
    pub role_title: String,
    pub function_name: String,
    pub gaps: Vec<SkillGap>,
    pub critical_count: usize,
    pub moderate_count: usize,
    pub no_gap_count: usize,
}

impl RoleGapSummary {
    /// A role without requirements has nothing to measure and must not read as fully ready.
    pub fn is_assessable(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn critical_gaps(&self) -> impl Iterator<Item = &SkillGap> {
        self.gaps
            .iter()
            .filter(|gap| gap.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub moderate: usize,
    pub no_gap: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::NoGap => self.no_gap += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.moderate + self.no_gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AggregateScope {
    Role(Uuid),
    Department(Uuid),
    Company(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessAggregate {
    pub scope: AggregateScope,
    pub total_gaps: usize,
    pub severity_counts: SeverityCounts,
    /// 0..=100, and 0 when there is nothing to measure.
    pub readiness_percent: f64,
}

impl ReadinessAggregate {
    pub fn is_assessable(&self) -> bool {
        self.total_gaps > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyReadiness {
    pub family_name: String,
    pub severity_counts: SeverityCounts,
    pub readiness_percent: f64,
}

/// A completed (or pending) assessment of one role instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentRecord {
    pub id: i64,
    pub role_id: Uuid,
    pub role_title: String,
    pub function_name: String,
    pub department_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Point-in-time read of an employee's cumulative XP.
#[derive(Debug, Clone, PartialEq)]
pub struct XpRecord {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub company_id: Uuid,
    pub department_id: Option<Uuid>,
    pub xp_total: i64,
}

/// A department or company that XP rolls up into.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    pub id: Uuid,
    pub name: String,
    /// Curated score, when one has been computed.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankCandidate {
    pub id: Uuid,
    pub name: String,
    pub score: Option<f64>,
    pub xp_total: i64,
    pub employee_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub score: f64,
    pub xp_total: i64,
    pub employee_count: usize,
    pub average_xp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serializes_to_fixed_literals() {
        let encoded = serde_json::to_string(&[
            Severity::Critical,
            Severity::Moderate,
            Severity::NoGap,
        ])
        .unwrap();
        assert_eq!(encoded, r#"["critical","moderate","no_gap"]"#);
        assert_eq!(Severity::NoGap.to_string(), "no_gap");
    }

    #[test]
    fn counts_total_matches_recorded() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::Critical);
        counts.record(Severity::NoGap);
        counts.record(Severity::NoGap);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.no_gap, 2);
    }

    #[test]
    fn scope_is_tagged_in_json() {
        let id = Uuid::nil();
        let encoded = serde_json::to_value(AggregateScope::Company(id)).unwrap();
        assert_eq!(encoded["kind"], "company");
        assert_eq!(encoded["id"], id.to_string());
    }
}
