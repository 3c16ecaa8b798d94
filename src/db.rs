use std::collections::HashMap;
use std::io::Read;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::CatalogError;
use crate::models::{Answer, AssessmentRecord, GroupRecord, SkillRequirement, XpRecord};

const COMPANY_ID: &str = "6f1c9a52-8c1e-4d4f-9a51-2f0b7c3e1d10";
const ENGINEERING_ID: &str = "a2b4c6d8-1e3f-4a5b-8c7d-9e0f1a2b3c4d";
const OPERATIONS_ID: &str = "b3c5d7e9-2f4a-4b6c-9d8e-0f1a2b3c4d5e";
const DATA_ENGINEER_ID: &str = "c4d6e8fa-3a5b-4c7d-8e9f-1a2b3c4d5e6f";
const SUPPORT_LEAD_ID: &str = "d5e7f90b-4b6c-4d8e-9fa0-2b3c4d5e6f70";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let company_id = Uuid::parse_str(COMPANY_ID)?;
    let engineering_id = Uuid::parse_str(ENGINEERING_ID)?;
    let operations_id = Uuid::parse_str(OPERATIONS_ID)?;
    let data_engineer_id = Uuid::parse_str(DATA_ENGINEER_ID)?;
    let support_lead_id = Uuid::parse_str(SUPPORT_LEAD_ID)?;

    sqlx::query(
        r#"
        INSERT INTO skill_gap.companies (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(company_id)
    .bind("Northwind Logistics")
    .execute(pool)
    .await?;

    let departments = vec![
        (engineering_id, "Engineering", None),
        (operations_id, "Operations", Some(64.0_f64)),
    ];
    for (id, name, score) in departments {
        sqlx::query(
            r#"
            INSERT INTO skill_gap.departments (id, company_id, name, score)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, score = EXCLUDED.score
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(name)
        .bind(score)
        .execute(pool)
        .await?;
    }

    let roles = vec![
        (data_engineer_id, engineering_id, "Data Engineer", "Technology"),
        (support_lead_id, operations_id, "Support Lead", "Customer Operations"),
    ];
    for (id, department_id, title, function_name) in roles {
        sqlx::query(
            r#"
            INSERT INTO skill_gap.roles (id, department_id, title, function_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, function_name = EXCLUDED.function_name
            "#,
        )
        .bind(id)
        .bind(department_id)
        .bind(title)
        .bind(function_name)
        .execute(pool)
        .await?;
    }

    let requirements = vec![
        (data_engineer_id, "sql", "SQL", "data", "Data", 4, 1.5),
        (data_engineer_id, "pipelines", "Pipeline Design", "data", "Data", 3, 1.0),
        (data_engineer_id, "cloud-storage", "Cloud Storage", "cloud", "Cloud", 3, 1.0),
        (support_lead_id, "triage", "Incident Triage", "service", "Service", 3, 1.0),
        (support_lead_id, "coaching", "Coaching", "people", "People", 2, 0.5),
        (support_lead_id, "sql", "SQL", "data", "Data", 2, 0.5),
    ];
    let role_ids: Vec<Uuid> = requirements.iter().map(|r| r.0).collect();
    let positions = positions_by_role(&role_ids);
    let mut tx = pool.begin().await?;
    for ((role_id, skill_id, skill_name, family_id, family_name, level, weight), position) in
        requirements.into_iter().zip(positions)
    {
        upsert_skill(&mut tx, skill_id, skill_name, family_id, family_name).await?;
        sqlx::query(
            r#"
            INSERT INTO skill_gap.role_requirements
            (role_id, skill_id, required_level, weight, position)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (role_id, skill_id) DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(skill_id)
        .bind(level)
        .bind(weight)
        .bind(position)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let employees = vec![
        ("Rosa Diaz", "rosa.diaz@northwind.example", engineering_id, 340_i64),
        ("Tomás Ferreira", "tomas.ferreira@northwind.example", engineering_id, 120),
        ("Mei Tanaka", "mei.tanaka@northwind.example", operations_id, 210),
        ("Olu Adeyemi", "olu.adeyemi@northwind.example", operations_id, 0),
    ];
    for (name, email, department_id, xp_total) in employees {
        sqlx::query(
            r#"
            INSERT INTO skill_gap.employees (id, company_id, department_id, full_name, email, xp_total)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                xp_total = GREATEST(skill_gap.employees.xp_total, EXCLUDED.xp_total)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(department_id)
        .bind(name)
        .bind(email)
        .bind(xp_total)
        .execute(pool)
        .await?;
    }

    let existing: i64 = sqlx::query("SELECT COUNT(*) AS total FROM skill_gap.assessments")
        .fetch_one(pool)
        .await?
        .get("total");
    if existing > 0 {
        info!(existing, "assessments already seeded");
        return Ok(());
    }

    let now = Utc::now();
    let assessments = vec![
        (
            data_engineer_id,
            "rosa.diaz@northwind.example",
            Some(now - Duration::days(40)),
            vec![("sql", 2), ("pipelines", 2), ("cloud-storage", 1)],
        ),
        (
            data_engineer_id,
            "rosa.diaz@northwind.example",
            Some(now - Duration::days(3)),
            vec![("sql", 4), ("pipelines", 2)],
        ),
        (
            support_lead_id,
            "mei.tanaka@northwind.example",
            Some(now - Duration::days(9)),
            vec![("triage", 3), ("coaching", 1), ("sql", 2)],
        ),
        (
            support_lead_id,
            "olu.adeyemi@northwind.example",
            None,
            vec![("triage", 1)],
        ),
    ];

    for (role_id, email, completed_at, answers) in assessments {
        let assessment_id = insert_assessment(pool, role_id, email, completed_at).await?;
        let mut tx = pool.begin().await?;
        for (skill_id, score) in answers {
            upsert_answer(
                &mut tx,
                &Answer {
                    assessment_id,
                    skill_id: skill_id.to_string(),
                    score,
                },
            )
            .await?;
        }
        tx.commit().await?;
    }

    Ok(())
}

/// Catalog position of each entry, numbered from 0 within its own role.
pub fn positions_by_role(role_ids: &[Uuid]) -> Vec<i32> {
    let mut next: HashMap<Uuid, i32> = HashMap::new();
    role_ids
        .iter()
        .map(|role_id| {
            let slot = next.entry(*role_id).or_insert(0);
            let position = *slot;
            *slot += 1;
            position
        })
        .collect()
}

async fn insert_assessment(
    pool: &PgPool,
    role_id: Uuid,
    email: &str,
    completed_at: Option<DateTime<Utc>>,
) -> anyhow::Result<i64> {
    let employee_id: Uuid = sqlx::query("SELECT id FROM skill_gap.employees WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .with_context(|| format!("no employee with email {email}"))?
        .get("id");

    let id: i64 = sqlx::query(
        r#"
        INSERT INTO skill_gap.assessments (role_id, employee_id, completed_at)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(role_id)
    .bind(employee_id)
    .bind(completed_at)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_skill(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    skill_id: &str,
    skill_name: &str,
    family_id: &str,
    family_name: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO skill_gap.skills (id, name, family_id, family_name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, family_id = EXCLUDED.family_id, family_name = EXCLUDED.family_name
        "#,
    )
    .bind(skill_id)
    .bind(skill_name)
    .bind(family_id)
    .bind(family_name)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_answer(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    answer: &Answer,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO skill_gap.answers (assessment_id, skill_id, score)
        VALUES ($1, $2, $3)
        ON CONFLICT (assessment_id, skill_id) DO UPDATE
        SET score = EXCLUDED.score, answered_at = now()
        "#,
    )
    .bind(answer.assessment_id)
    .bind(&answer.skill_id)
    .bind(answer.score)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

#[derive(serde::Deserialize)]
struct RequirementRow {
    role_id: Uuid,
    skill_id: String,
    skill_name: String,
    family_id: String,
    family_name: String,
    required_level: i32,
    weight: f64,
}

#[derive(serde::Deserialize)]
struct AnswerRow {
    assessment_id: i64,
    skill_id: String,
    score: i32,
}

/// Reads catalog rows, keeping file order as catalog order.
pub fn parse_requirement_rows<R: Read>(
    mut reader: csv::Reader<R>,
) -> Result<Vec<SkillRequirement>, CatalogError> {
    let mut requirements: Vec<SkillRequirement> = Vec::new();

    for result in reader.deserialize::<RequirementRow>() {
        let row = result?;
        if !(row.weight.is_finite() && row.weight > 0.0) {
            return Err(CatalogError::InvalidWeight {
                skill_id: row.skill_id,
                weight: row.weight,
            });
        }
        if requirements
            .iter()
            .any(|r| r.role_id == row.role_id && r.skill_id == row.skill_id)
        {
            return Err(CatalogError::DuplicateRequirement {
                role_id: row.role_id,
                skill_id: row.skill_id,
            });
        }

        requirements.push(SkillRequirement {
            role_id: row.role_id,
            skill_id: row.skill_id,
            skill_name: row.skill_name,
            family_id: row.family_id,
            family_name: row.family_name,
            required_level: row.required_level,
            weight: row.weight,
        });
    }

    Ok(requirements)
}

/// Reads answer rows. A later row for the same (assessment, skill) replaces the earlier one.
pub fn parse_answer_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Answer>, CatalogError> {
    let mut answers: Vec<Answer> = Vec::new();

    for result in reader.deserialize::<AnswerRow>() {
        let row = result?;
        let answer = Answer {
            assessment_id: row.assessment_id,
            skill_id: row.skill_id,
            score: row.score,
        };
        match answers
            .iter_mut()
            .find(|a| a.assessment_id == answer.assessment_id && a.skill_id == answer.skill_id)
        {
            Some(existing) => existing.score = answer.score,
            None => answers.push(answer),
        }
    }

    Ok(answers)
}

/// Replaces the catalog of every role named in the file.
///
/// A role whose assessments already have answers is locked and the whole import is refused.
pub async fn import_requirements(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let reader = csv::Reader::from_path(csv_path).map_err(CatalogError::from)?;
    let requirements = parse_requirement_rows(reader)?;

    let mut role_ids: Vec<Uuid> = Vec::new();
    for requirement in &requirements {
        if !role_ids.contains(&requirement.role_id) {
            role_ids.push(requirement.role_id);
        }
    }

    // Role rows stay locked until commit; answer imports share-lock the same rows.
    let mut tx = pool.begin().await?;
    for role_id in &role_ids {
        let locked = sqlx::query("SELECT id FROM skill_gap.roles WHERE id = $1 FOR UPDATE")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(CatalogError::UnknownRole(*role_id).into());
        }

        let answered: bool = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM skill_gap.answers an
                JOIN skill_gap.assessments a ON a.id = an.assessment_id
                WHERE a.role_id = $1
            ) AS answered
            "#,
        )
        .bind(role_id)
        .fetch_one(&mut *tx)
        .await?
        .get("answered");
        if answered {
            warn!(%role_id, "refusing to modify answered role catalog");
            return Err(CatalogError::RequirementsLocked { role_id: *role_id }.into());
        }
    }

    for role_id in &role_ids {
        sqlx::query("DELETE FROM skill_gap.role_requirements WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
    }

    for role_id in &role_ids {
        for (position, requirement) in requirements
            .iter()
            .filter(|r| r.role_id == *role_id)
            .enumerate()
        {
            upsert_skill(
                &mut tx,
                &requirement.skill_id,
                &requirement.skill_name,
                &requirement.family_id,
                &requirement.family_name,
            )
            .await?;

            sqlx::query(
                r#"
                INSERT INTO skill_gap.role_requirements
                (role_id, skill_id, required_level, weight, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(requirement.role_id)
            .bind(&requirement.skill_id)
            .bind(requirement.required_level)
            .bind(requirement.weight)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;

    info!(roles = role_ids.len(), requirements = requirements.len(), "imported catalog");
    Ok(requirements.len())
}

/// Upserts answers on (assessment, skill); re-submission overwrites the earlier score.
pub async fn import_answers(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let reader = csv::Reader::from_path(csv_path).map_err(CatalogError::from)?;
    let answers = parse_answer_rows(reader)?;
    let mut written = 0usize;

    let mut tx = pool.begin().await?;
    for answer in &answers {
        // Shares the role lock taken by catalog imports.
        let role = sqlx::query(
            r#"
            SELECT r.id FROM skill_gap.assessments a
            JOIN skill_gap.roles r ON r.id = a.role_id
            WHERE a.id = $1
            FOR SHARE OF r
            "#,
        )
        .bind(answer.assessment_id)
        .fetch_optional(&mut *tx)
        .await?;
        if role.is_none() {
            return Err(CatalogError::UnknownAssessment(answer.assessment_id).into());
        }

        if upsert_answer(&mut tx, answer).await? > 0 {
            written += 1;
        }
    }
    tx.commit().await?;

    Ok(written)
}

pub async fn fetch_requirements(
    pool: &PgPool,
    role_id: Uuid,
) -> anyhow::Result<Vec<SkillRequirement>> {
    let rows = sqlx::query(
        r#"
        SELECT rr.role_id, rr.skill_id, s.name AS skill_name, s.family_id, s.family_name,
               rr.required_level, rr.weight
        FROM skill_gap.role_requirements rr
        JOIN skill_gap.skills s ON s.id = rr.skill_id
        WHERE rr.role_id = $1
        ORDER BY rr.position, rr.skill_id
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| SkillRequirement {
            role_id: row.get("role_id"),
            skill_id: row.get("skill_id"),
            skill_name: row.get("skill_name"),
            family_id: row.get("family_id"),
            family_name: row.get("family_name"),
            required_level: row.get("required_level"),
            weight: row.get("weight"),
        })
        .collect())
}

pub async fn fetch_answers(pool: &PgPool, assessment_id: i64) -> anyhow::Result<Vec<Answer>> {
    let rows = sqlx::query(
        "SELECT assessment_id, skill_id, score FROM skill_gap.answers WHERE assessment_id = $1",
    )
    .bind(assessment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Answer {
            assessment_id: row.get("assessment_id"),
            skill_id: row.get("skill_id"),
            score: row.get("score"),
        })
        .collect())
}

const ASSESSMENT_SELECT: &str = "SELECT a.id, a.role_id, r.title, r.function_name, \
     r.department_id, a.employee_id, a.completed_at \
     FROM skill_gap.assessments a \
     JOIN skill_gap.roles r ON r.id = a.role_id \
     JOIN skill_gap.departments d ON d.id = r.department_id";

fn assessment_from_row(row: &sqlx::postgres::PgRow) -> AssessmentRecord {
    AssessmentRecord {
        id: row.get("id"),
        role_id: row.get("role_id"),
        role_title: row.get("title"),
        function_name: row.get("function_name"),
        department_id: row.get("department_id"),
        employee_id: row.get("employee_id"),
        completed_at: row.get("completed_at"),
    }
}

pub async fn fetch_assessment(pool: &PgPool, assessment_id: i64) -> anyhow::Result<AssessmentRecord> {
    let query = format!("{ASSESSMENT_SELECT} WHERE a.id = $1");
    let row = sqlx::query(&query)
        .bind(assessment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(CatalogError::UnknownAssessment(assessment_id))?;
    Ok(assessment_from_row(&row))
}

pub async fn fetch_assessments(
    pool: &PgPool,
    company_id: Option<Uuid>,
    department_id: Option<Uuid>,
) -> anyhow::Result<Vec<AssessmentRecord>> {
    let mut query = String::from(ASSESSMENT_SELECT);

    if company_id.is_some() {
        query.push_str(" WHERE d.company_id = $1");
    } else if department_id.is_some() {
        query.push_str(" WHERE d.id = $1");
    }
    query.push_str(" ORDER BY a.id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = company_id.or(department_id) {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(assessment_from_row).collect())
}

pub async fn fetch_xp_records(
    pool: &PgPool,
    company_id: Option<Uuid>,
) -> anyhow::Result<Vec<XpRecord>> {
    let mut query = String::from(
        "SELECT id, full_name, company_id, department_id, xp_total FROM skill_gap.employees",
    );
    if company_id.is_some() {
        query.push_str(" WHERE company_id = $1");
    }
    query.push_str(" ORDER BY full_name, id");

    let mut rows = sqlx::query(&query);
    if let Some(value) = company_id {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records
        .into_iter()
        .map(|row| XpRecord {
            employee_id: row.get("id"),
            employee_name: row.get("full_name"),
            company_id: row.get("company_id"),
            department_id: row.get("department_id"),
            xp_total: row.get("xp_total"),
        })
        .collect())
}

pub async fn fetch_departments(pool: &PgPool, company_id: Uuid) -> anyhow::Result<Vec<GroupRecord>> {
    let rows = sqlx::query(
        "SELECT id, name, score FROM skill_gap.departments WHERE company_id = $1 ORDER BY name, id",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(group_from_row).collect())
}

pub async fn fetch_companies(pool: &PgPool) -> anyhow::Result<Vec<GroupRecord>> {
    let rows = sqlx::query("SELECT id, name, score FROM skill_gap.companies ORDER BY name, id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(group_from_row).collect())
}

fn group_from_row(row: sqlx::postgres::PgRow) -> GroupRecord {
    GroupRecord {
        id: row.get("id"),
        name: row.get("name"),
        score: row.get("score"),
    }
}
