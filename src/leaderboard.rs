use std::cmp::Ordering;
use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{GroupRecord, LeaderboardEntry, RankCandidate, XpRecord};

pub const DEFAULT_EMPLOYEE_LIMIT: usize = 10;

/// Ranks candidates by score, descending, falling back to XP when no curated score exists.
///
/// Equal scores keep their input order. Ranks are 1-based positions in the sorted output.
pub fn rank_entities(candidates: &[RankCandidate]) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(f64, &RankCandidate)> = candidates
        .iter()
        .map(|candidate| (effective_score(candidate), candidate))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (score, candidate))| {
            let xp_total = candidate.xp_total.max(0);
            LeaderboardEntry {
                rank: position + 1,
                entity_id: candidate.id,
                entity_name: candidate.name.clone(),
                score,
                xp_total,
                employee_count: candidate.employee_count,
                average_xp: average_xp(xp_total, candidate.employee_count),
            }
        })
        .collect()
}

pub fn average_xp(xp_total: i64, employee_count: usize) -> i64 {
    if employee_count == 0 {
        return 0;
    }
    (xp_total as f64 / employee_count as f64).round() as i64
}

fn effective_score(candidate: &RankCandidate) -> f64 {
    match candidate.score {
        Some(score) if score.is_finite() => score,
        _ => candidate.xp_total.max(0) as f64,
    }
}

/// Individual leaderboard: employees with XP only, top `limit` by XP.
pub fn rank_employees(records: &[XpRecord], limit: usize) -> Vec<LeaderboardEntry> {
    let candidates: Vec<RankCandidate> = records
        .iter()
        .filter(|record| record.xp_total > 0)
        .map(|record| RankCandidate {
            id: record.employee_id,
            name: record.employee_name.clone(),
            score: None,
            xp_total: record.xp_total,
            employee_count: 1,
        })
        .collect();

    let mut ranked = rank_entities(&candidates);
    ranked.truncate(limit);
    ranked
}

/// Sums XP and headcount per department. Departments without employees still appear.
pub fn rollup_departments(
    records: &[XpRecord],
    departments: &[GroupRecord],
) -> Vec<RankCandidate> {
    let members = records
        .iter()
        .filter_map(|record| record.department_id.map(|id| (id, record)));
    rollup(departments, members)
}

/// Keeps only the requested group when a scope is given, matching XP records read for that scope.
pub fn restrict_to(groups: Vec<GroupRecord>, scope: Option<Uuid>) -> Vec<GroupRecord> {
    match scope {
        Some(id) => groups.into_iter().filter(|group| group.id == id).collect(),
        None => groups,
    }
}

/// Sums XP and headcount per company.
pub fn rollup_companies(records: &[XpRecord], companies: &[GroupRecord]) -> Vec<RankCandidate> {
    rollup(companies, records.iter().map(|r| (r.company_id, r)))
}

fn rollup<'a>(
    groups: &[GroupRecord],
    members: impl Iterator<Item = (Uuid, &'a XpRecord)>,
) -> Vec<RankCandidate> {
    let mut totals: HashMap<Uuid, (i64, usize)> = HashMap::new();
    for (group_id, record) in members {
        let entry = totals.entry(group_id).or_insert((0, 0));
        entry.0 += record.xp_total.max(0);
        entry.1 += 1;
    }

    groups
        .iter()
        .map(|group| {
            let (xp_total, employee_count) = totals.get(&group.id).copied().unwrap_or((0, 0));
            RankCandidate {
                id: group.id,
                name: group.name.clone(),
                score: group.score,
                xp_total,
                employee_count,
            }
        })
        .collect()
}
