use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::classifier::{classify, clamp_inputs};
use crate::models::{Answer, RoleGapSummary, Severity, SkillGap, SkillRequirement};

/// Classifies every requirement of one role against one answer set.
///
/// Gaps keep catalog order. Callers pass at most one answer per skill; if duplicates slip
/// through, the last one in the slice wins.
pub fn summarize_role(
    role_id: Uuid,
    role_title: &str,
    function_name: &str,
    requirements: &[SkillRequirement],
    answers: &[Answer],
) -> RoleGapSummary {
    let scores: HashMap<&str, i32> = answers
        .iter()
        .map(|answer| (answer.skill_id.as_str(), answer.score))
        .collect();

    let mut summary = RoleGapSummary {
        role_id,
        role_title: role_title.to_string(),
        function_name: function_name.to_string(),
        gaps: Vec::with_capacity(requirements.len()),
        critical_count: 0,
        moderate_count: 0,
        no_gap_count: 0,
    };

    for requirement in requirements {
        let answered = scores.get(requirement.skill_id.as_str()).copied();
        let (required_level, achieved_score) =
            clamp_inputs(requirement.required_level, answered);
        let severity = classify(required_level, Some(achieved_score));

        match severity {
            Severity::Critical => summary.critical_count += 1,
            Severity::Moderate => summary.moderate_count += 1,
            Severity::NoGap => summary.no_gap_count += 1,
        }

        summary.gaps.push(SkillGap {
            skill_id: requirement.skill_id.clone(),
            skill_name: requirement.skill_name.clone(),
            family_name: requirement.family_name.clone(),
            required_level,
            achieved_score,
            weight: requirement.weight,
            severity,
        });
    }

    debug!(
        %role_id,
        skills = summary.gaps.len(),
        critical = summary.critical_count,
        moderate = summary.moderate_count,
        "summarized role gaps"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirement(role_id: Uuid, skill_id: &str, required_level: i32) -> SkillRequirement {
        SkillRequirement {
            role_id,
            skill_id: skill_id.to_string(),
            skill_name: format!("Skill {skill_id}"),
            family_id: "data".to_string(),
            family_name: "Data".to_string(),
            required_level,
            weight: 1.0,
        }
    }

    fn answer(skill_id: &str, score: i32) -> Answer {
        Answer {
            assessment_id: 7,
            skill_id: skill_id.to_string(),
            score,
        }
    }

    #[test]
    fn classifies_each_requirement_in_catalog_order() {
        let role_id = Uuid::new_v4();
        let requirements = vec![
            requirement(role_id, "s3", 3),
            requirement(role_id, "s1", 3),
            requirement(role_id, "s2", 4),
        ];
        let answers = vec![answer("s1", 4), answer("s3", 2)];

        let summary = summarize_role(role_id, "Analyst", "Finance", &requirements, &answers);

        let order: Vec<&str> = summary.gaps.iter().map(|g| g.skill_id.as_str()).collect();
        assert_eq!(order, vec!["s3", "s1", "s2"]);
        assert_eq!(summary.gaps[0].severity, Severity::Moderate);
        assert_eq!(summary.gaps[1].severity, Severity::NoGap);
        assert_eq!(summary.gaps[2].severity, Severity::Critical);
        assert_eq!(summary.gaps[2].achieved_score, 0);
        assert_eq!(
            summary.critical_count + summary.moderate_count + summary.no_gap_count,
            summary.gaps.len()
        );
    }

    #[test]
    fn answers_for_unknown_skills_are_ignored() {
        let role_id = Uuid::new_v4();
        let requirements = vec![requirement(role_id, "s1", 2)];
        let answers = vec![answer("s1", 2), answer("other", 1)];

        let summary = summarize_role(role_id, "Analyst", "Finance", &requirements, &answers);
        assert_eq!(summary.gaps.len(), 1);
        assert_eq!(summary.no_gap_count, 1);
    }

    #[test]
    fn out_of_range_values_are_stored_clamped() {
        let role_id = Uuid::new_v4();
        let requirements = vec![requirement(role_id, "s1", 9), requirement(role_id, "s2", 0)];
        let answers = vec![answer("s1", -7), answer("s2", 3)];

        let summary = summarize_role(role_id, "Analyst", "Finance", &requirements, &answers);
        assert_eq!(summary.gaps[0].required_level, 4);
        assert_eq!(summary.gaps[0].achieved_score, 0);
        assert_eq!(summary.gaps[0].severity, Severity::Critical);
        assert_eq!(summary.gaps[1].required_level, 1);
        assert_eq!(summary.gaps[1].achieved_score, 3);
        assert_eq!(summary.gaps[1].severity, Severity::NoGap);
    }

    #[test]
    fn empty_catalog_is_not_assessable() {
        let role_id = Uuid::new_v4();
        let summary = summarize_role(role_id, "Analyst", "Finance", &[], &[answer("s1", 5)]);
        assert!(summary.gaps.is_empty());
        assert_eq!(summary.critical_count, 0);
        assert_eq!(summary.moderate_count, 0);
        assert_eq!(summary.no_gap_count, 0);
        assert!(!summary.is_assessable());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let role_id = Uuid::new_v4();
        let requirements: Vec<SkillRequirement> = (1..=6)
            .map(|i| requirement(role_id, &format!("s{i}"), (i % 4) + 1))
            .collect();
        let answers: Vec<Answer> = (1..=6).map(|i| answer(&format!("s{i}"), i % 3)).collect();

        let first = summarize_role(role_id, "Analyst", "Finance", &requirements, &answers);
        let second = summarize_role(role_id, "Analyst", "Finance", &requirements, &answers);
        assert_eq!(first, second);
    }

    #[test]
    fn critical_gaps_filters_by_severity() {
        let role_id = Uuid::new_v4();
        let requirements = vec![requirement(role_id, "s1", 4), requirement(role_id, "s2", 1)];
        let summary = summarize_role(role_id, "Analyst", "Finance", &requirements, &[]);
        let critical: Vec<&str> = summary
            .critical_gaps()
            .map(|g| g.skill_id.as_str())
            .collect();
        assert_eq!(critical, vec!["s1"]);
    }
}
