use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AggregateScope, AssessmentRecord, FamilyReadiness, ReadinessAggregate, RoleGapSummary,
    SeverityCounts,
};

/// Share of no-gap skills as a whole percentage; 0 when there is nothing to measure.
pub fn readiness_percent(no_gap: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * no_gap as f64 / total as f64).round()
}

/// Rolls a set of role summaries into one readiness figure.
///
/// Each summary stands for one assessed instance, so a role assessed five times contributes
/// five times. Requirement weights are carried on the gaps but not applied here.
pub fn aggregate(scope: AggregateScope, summaries: &[RoleGapSummary]) -> ReadinessAggregate {
    let mut counts = SeverityCounts::default();

    for gap in summaries.iter().flat_map(|summary| summary.gaps.iter()) {
        counts.record(gap.severity);
    }

    let total_gaps = counts.total();
    let aggregate = ReadinessAggregate {
        scope,
        total_gaps,
        severity_counts: counts,
        readiness_percent: readiness_percent(counts.no_gap, total_gaps),
    };

    debug!(
        ?scope,
        summaries = summaries.len(),
        total_gaps,
        readiness = aggregate.readiness_percent,
        "aggregated readiness"
    );

    aggregate
}

/// Readiness broken down by skill family, families in first-seen order.
pub fn aggregate_by_family(summaries: &[RoleGapSummary]) -> Vec<FamilyReadiness> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut families: Vec<FamilyReadiness> = Vec::new();

    for gap in summaries.iter().flat_map(|summary| summary.gaps.iter()) {
        let slot = *index.entry(gap.family_name.as_str()).or_insert_with(|| {
            families.push(FamilyReadiness {
                family_name: gap.family_name.clone(),
                severity_counts: SeverityCounts::default(),
                readiness_percent: 0.0,
            });
            families.len() - 1
        });
        families[slot].severity_counts.record(gap.severity);
    }

    for family in families.iter_mut() {
        family.readiness_percent =
            readiness_percent(family.severity_counts.no_gap, family.severity_counts.total());
    }

    families
}

/// Picks the authoritative assessment for each role.
///
/// Only completed assessments are eligible. The most recent `completed_at` wins and ties go to
/// the highest assessment id. Roles come back in the order they first appear in the input.
pub fn select_latest_per_role(assessments: &[AssessmentRecord]) -> Vec<&AssessmentRecord> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut selected: Vec<(DateTime<Utc>, &AssessmentRecord)> = Vec::new();

    for assessment in assessments {
        let Some(completed_at) = assessment.completed_at else {
            continue;
        };

        match index.get(&assessment.role_id) {
            Some(&slot) => {
                let (current_at, current) = selected[slot];
                if (completed_at, assessment.id) > (current_at, current.id) {
                    selected[slot] = (completed_at, assessment);
                }
            }
            None => {
                index.insert(assessment.role_id, selected.len());
                selected.push((completed_at, assessment));
            }
        }
    }

    selected.into_iter().map(|(_, assessment)| assessment).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, SkillGap};
    use chrono::{Duration, TimeZone};

    fn gap(family: &str, severity: Severity) -> SkillGap {
        SkillGap {
            skill_id: "s".to_string(),
            skill_name: "Skill".to_string(),
            family_name: family.to_string(),
            required_level: 3,
            achieved_score: 0,
            weight: 1.0,
            severity,
        }
    }

    fn summary(gaps: Vec<SkillGap>) -> RoleGapSummary {
        let mut counts = SeverityCounts::default();
        for g in &gaps {
            counts.record(g.severity);
        }
        RoleGapSummary {
            role_id: Uuid::new_v4(),
            role_title: "Engineer".to_string(),
            function_name: "Technology".to_string(),
            gaps,
            critical_count: counts.critical,
            moderate_count: counts.moderate,
            no_gap_count: counts.no_gap,
        }
    }

    fn assessment(id: i64, role_id: Uuid, days_ago: Option<i64>) -> AssessmentRecord {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        AssessmentRecord {
            id,
            role_id,
            role_title: "Engineer".to_string(),
            function_name: "Technology".to_string(),
            department_id: Uuid::nil(),
            employee_id: None,
            completed_at: days_ago.map(|d| base - Duration::days(d)),
        }
    }

    #[test]
    fn percent_rounds_and_guards_zero() {
        assert_eq!(readiness_percent(0, 0), 0.0);
        assert_eq!(readiness_percent(1, 3), 33.0);
        assert_eq!(readiness_percent(2, 3), 67.0);
        assert_eq!(readiness_percent(4, 4), 100.0);
    }

    #[test]
    fn aggregate_flattens_every_summary() {
        let summaries = vec![
            summary(vec![gap("Data", Severity::NoGap), gap("Data", Severity::Critical)]),
            summary(vec![gap("Cloud", Severity::Moderate), gap("Cloud", Severity::NoGap)]),
        ];
        let company = Uuid::new_v4();

        let result = aggregate(AggregateScope::Company(company), &summaries);
        assert_eq!(result.total_gaps, 4);
        assert_eq!(result.severity_counts.critical, 1);
        assert_eq!(result.severity_counts.moderate, 1);
        assert_eq!(result.severity_counts.no_gap, 2);
        assert_eq!(result.readiness_percent, 50.0);
        assert_eq!(result.scope, AggregateScope::Company(company));
    }

    #[test]
    fn repeated_instances_count_each_time() {
        let instance = summary(vec![gap("Data", Severity::NoGap)]);
        let other = summary(vec![gap("Data", Severity::Critical)]);
        let summaries = vec![instance.clone(), instance.clone(), instance, other];

        let result = aggregate(AggregateScope::Department(Uuid::nil()), &summaries);
        assert_eq!(result.total_gaps, 4);
        assert_eq!(result.readiness_percent, 75.0);
    }

    #[test]
    fn weight_does_not_change_percent() {
        let mut heavy = gap("Data", Severity::Critical);
        heavy.weight = 10.0;
        let summaries = vec![summary(vec![heavy, gap("Data", Severity::NoGap)])];
        let result = aggregate(AggregateScope::Role(Uuid::nil()), &summaries);
        assert_eq!(result.readiness_percent, 50.0);
    }

    #[test]
    fn empty_input_is_zero_and_not_assessable() {
        let result = aggregate(AggregateScope::Company(Uuid::nil()), &[]);
        assert_eq!(result.total_gaps, 0);
        assert_eq!(result.readiness_percent, 0.0);
        assert!(!result.is_assessable());

        let result = aggregate(AggregateScope::Company(Uuid::nil()), &[summary(vec![])]);
        assert_eq!(result.readiness_percent, 0.0);
    }

    #[test]
    fn families_keep_first_seen_order() {
        let summaries = vec![
            summary(vec![gap("Data", Severity::NoGap), gap("Cloud", Severity::Critical)]),
            summary(vec![gap("Data", Severity::Moderate), gap("Cloud", Severity::NoGap)]),
        ];
        let families = aggregate_by_family(&summaries);
        let names: Vec<&str> = families.iter().map(|f| f.family_name.as_str()).collect();
        assert_eq!(names, vec!["Data", "Cloud"]);
        assert_eq!(families[0].severity_counts.total(), 2);
        assert_eq!(families[0].readiness_percent, 50.0);
        assert_eq!(families[1].severity_counts.critical, 1);
    }

    #[test]
    fn latest_completed_assessment_wins() {
        let role_a = Uuid::new_v4();
        let role_b = Uuid::new_v4();
        let assessments = vec![
            assessment(1, role_a, Some(10)),
            assessment(2, role_b, Some(5)),
            assessment(3, role_a, Some(2)),
            assessment(4, role_a, None),
            assessment(5, role_b, Some(8)),
        ];

        let selected = select_latest_per_role(&assessments);
        let ids: Vec<i64> = selected.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn same_completion_time_prefers_highest_id() {
        let role = Uuid::new_v4();
        let assessments = vec![
            assessment(12, role, Some(1)),
            assessment(40, role, Some(1)),
            assessment(31, role, Some(1)),
        ];
        let selected = select_latest_per_role(&assessments);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 40);
    }

    #[test]
    fn pending_only_roles_are_skipped() {
        let assessments = vec![assessment(1, Uuid::new_v4(), None)];
        assert!(select_latest_per_role(&assessments).is_empty());
    }
}
