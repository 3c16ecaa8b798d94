use std::fmt::Write;

use crate::models::{FamilyReadiness, LeaderboardEntry, ReadinessAggregate, RoleGapSummary};

pub fn readiness_label(aggregate: &ReadinessAggregate) -> String {
    if aggregate.is_assessable() {
        format!("{:.0}%", aggregate.readiness_percent)
    } else {
        "Not assessable".to_string()
    }
}

pub fn build_report(
    label: &str,
    aggregate: &ReadinessAggregate,
    families: &[FamilyReadiness],
    summaries: &[RoleGapSummary],
    departments: &[LeaderboardEntry],
    employees: &[LeaderboardEntry],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Workforce Readiness Report");
    let _ = writeln!(output, "Generated for {label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Readiness");
    let _ = writeln!(output, "- Overall readiness: {}", readiness_label(aggregate));
    let _ = writeln!(
        output,
        "- Skills evaluated: {} ({} critical, {} moderate, {} no gap)",
        aggregate.total_gaps,
        aggregate.severity_counts.critical,
        aggregate.severity_counts.moderate,
        aggregate.severity_counts.no_gap
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Families");

    if families.is_empty() {
        let _ = writeln!(output, "No skills evaluated.");
    } else {
        for family in families {
            let _ = writeln!(
                output,
                "- {}: {:.0}% ready ({} critical, {} moderate)",
                family.family_name,
                family.readiness_percent,
                family.severity_counts.critical,
                family.severity_counts.moderate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Role Gaps");

    if summaries.is_empty() {
        let _ = writeln!(output, "No completed assessments.");
    } else {
        for summary in summaries {
            if !summary.is_assessable() {
                let _ = writeln!(
                    output,
                    "- {} ({}): no requirements defined",
                    summary.role_title, summary.function_name
                );
                continue;
            }

            let critical: Vec<&str> = summary
                .critical_gaps()
                .map(|gap| gap.skill_name.as_str())
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}): {} critical, {} moderate, {} no gap",
                summary.role_title,
                summary.function_name,
                summary.critical_count,
                summary.moderate_count,
                summary.no_gap_count
            );
            if !critical.is_empty() {
                let _ = writeln!(output, "  - critical: {}", critical.join(", "));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Department Leaderboard");
    write_leaderboard(&mut output, departments, "No departments recorded.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Employees");
    write_leaderboard(&mut output, employees, "No employees have earned XP yet.");

    output
}

fn write_leaderboard(output: &mut String, entries: &[LeaderboardEntry], empty: &str) {
    if entries.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }

    for entry in entries {
        let _ = writeln!(
            output,
            "{}. {} score {:.0} ({} XP across {} employees, avg {})",
            entry.rank,
            entry.entity_name,
            entry.score,
            entry.xp_total,
            entry.employee_count,
            entry.average_xp
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregateScope, Answer, SkillRequirement};
    use crate::readiness::{aggregate, aggregate_by_family};
    use crate::summary::summarize_role;
    use uuid::Uuid;

    fn requirement(role_id: Uuid, skill_id: &str, name: &str, level: i32) -> SkillRequirement {
        SkillRequirement {
            role_id,
            skill_id: skill_id.to_string(),
            skill_name: name.to_string(),
            family_id: "data".to_string(),
            family_name: "Data".to_string(),
            required_level: level,
            weight: 1.0,
        }
    }

    #[test]
    fn report_lists_critical_skills_and_readiness() {
        let role_id = Uuid::new_v4();
        let requirements = vec![
            requirement(role_id, "sql", "SQL", 4),
            requirement(role_id, "etl", "Pipeline Design", 3),
        ];
        let answers = vec![Answer {
            assessment_id: 1,
            skill_id: "etl".to_string(),
            score: 3,
        }];
        let summaries = vec![summarize_role(
            role_id,
            "Data Engineer",
            "Technology",
            &requirements,
            &answers,
        )];
        let overall = aggregate(AggregateScope::Company(Uuid::nil()), &summaries);
        let families = aggregate_by_family(&summaries);

        let report = build_report("Northwind", &overall, &families, &summaries, &[], &[]);
        assert!(report.contains("Generated for Northwind"));
        assert!(report.contains("Overall readiness: 50%"));
        assert!(report.contains("critical: SQL"));
        assert!(report.contains("- Data: 50% ready"));
        assert!(report.contains("No employees have earned XP yet."));
    }

    #[test]
    fn empty_scope_is_not_assessable() {
        let overall = aggregate(AggregateScope::Company(Uuid::nil()), &[]);
        let report = build_report("Empty Co", &overall, &[], &[], &[], &[]);
        assert!(report.contains("Overall readiness: Not assessable"));
        assert!(report.contains("No completed assessments."));
    }
}
