use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod classifier;
mod config;
mod db;
mod errors;
mod leaderboard;
mod models;
mod readiness;
mod report;
mod summary;

use crate::config::Config;
use crate::models::{AggregateScope, RoleGapSummary};

#[derive(Parser)]
#[command(name = "skillgap-readiness")]
#[command(about = "Skill gap scoring, readiness aggregation and XP leaderboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Board {
    Employees,
    Departments,
    Companies,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic demo company
    Seed,
    /// Replace role skill requirements from a CSV file
    ImportRequirements {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Upsert assessment answers from a CSV file
    ImportAnswers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the gap summary for one assessment
    Summarize {
        #[arg(long)]
        assessment: i64,
        #[arg(long)]
        json: bool,
    },
    /// Aggregate readiness for a company or department
    #[command(group(
        ArgGroup::new("scope")
            .args(["company", "department"])
            .required(true)
            .multiple(false)
    ))]
    Readiness {
        #[arg(long)]
        company: Option<Uuid>,
        #[arg(long)]
        department: Option<Uuid>,
        /// Count every completed assessment instead of the latest per role
        #[arg(long)]
        all_assessments: bool,
        #[arg(long)]
        json: bool,
    },
    /// Rank employees, departments or companies
    Leaderboard {
        #[arg(long, value_enum, default_value = "employees")]
        by: Board,
        #[arg(long)]
        company: Option<Uuid>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown readiness report for a company
    Report {
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        all_assessments: bool,
        #[arg(long, default_value = "readiness.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("skillgap_readiness={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!("connected to Postgres");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportRequirements { csv } => {
            let imported = db::import_requirements(&pool, &csv).await?;
            println!("Imported {imported} requirements from {}.", csv.display());
        }
        Commands::ImportAnswers { csv } => {
            let written = db::import_answers(&pool, &csv).await?;
            println!("Wrote {written} answers from {}.", csv.display());
        }
        Commands::Summarize { assessment, json } => {
            let record = db::fetch_assessment(&pool, assessment).await?;
            let summary = summarize_assessment(&pool, &record).await?;

            if json {
                return print_json(&summary);
            }

            println!(
                "{} ({}), assessment {}",
                summary.role_title, summary.function_name, record.id
            );
            if !summary.is_assessable() {
                println!("No requirements defined for this role; not assessable.");
                return Ok(());
            }
            for gap in &summary.gaps {
                println!(
                    "- {} [{}] required {} achieved {}: {}",
                    gap.skill_name,
                    gap.family_name,
                    gap.required_level,
                    gap.achieved_score,
                    gap.severity
                );
            }
            println!(
                "{} critical, {} moderate, {} no gap",
                summary.critical_count, summary.moderate_count, summary.no_gap_count
            );
        }
        Commands::Readiness {
            company,
            department,
            all_assessments,
            json,
        } => {
            let scope = match (company, department) {
                (Some(id), _) => AggregateScope::Company(id),
                (None, Some(id)) => AggregateScope::Department(id),
                (None, None) => bail!("either --company or --department is required"),
            };
            let summaries = load_summaries(&pool, company, department, !all_assessments).await?;
            let overall = readiness::aggregate(scope, &summaries);
            let families = readiness::aggregate_by_family(&summaries);

            if json {
                #[derive(Serialize)]
                struct ReadinessOutput<'a> {
                    aggregate: &'a models::ReadinessAggregate,
                    families: &'a [models::FamilyReadiness],
                }
                return print_json(&ReadinessOutput {
                    aggregate: &overall,
                    families: &families,
                });
            }

            println!(
                "Readiness {} across {} skills from {} assessments",
                report::readiness_label(&overall),
                overall.total_gaps,
                summaries.len()
            );
            for family in &families {
                println!(
                    "- {}: {:.0}% ({} critical, {} moderate)",
                    family.family_name,
                    family.readiness_percent,
                    family.severity_counts.critical,
                    family.severity_counts.moderate
                );
            }
        }
        Commands::Leaderboard {
            by,
            company,
            limit,
            json,
        } => {
            let records = db::fetch_xp_records(&pool, company).await?;
            let entries = match by {
                Board::Employees => {
                    leaderboard::rank_employees(&records, limit.unwrap_or(config.leaderboard_limit))
                }
                Board::Departments => {
                    let Some(company_id) = company else {
                        bail!("--company is required for the department leaderboard");
                    };
                    let departments = db::fetch_departments(&pool, company_id).await?;
                    let mut ranked = leaderboard::rank_entities(&leaderboard::rollup_departments(
                        &records,
                        &departments,
                    ));
                    if let Some(limit) = limit {
                        ranked.truncate(limit);
                    }
                    ranked
                }
                Board::Companies => {
                    let companies =
                        leaderboard::restrict_to(db::fetch_companies(&pool).await?, company);
                    let mut ranked = leaderboard::rank_entities(&leaderboard::rollup_companies(
                        &records, &companies,
                    ));
                    if let Some(limit) = limit {
                        ranked.truncate(limit);
                    }
                    ranked
                }
            };

            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No leaderboard entries.");
                return Ok(());
            }
            for entry in &entries {
                println!(
                    "{}. {} score {:.0} ({} XP, {} employees, avg {})",
                    entry.rank,
                    entry.entity_name,
                    entry.score,
                    entry.xp_total,
                    entry.employee_count,
                    entry.average_xp
                );
            }
        }
        Commands::Report {
            company,
            all_assessments,
            out,
        } => {
            let label = db::fetch_companies(&pool)
                .await?
                .into_iter()
                .find(|c| c.id == company)
                .map(|c| c.name)
                .with_context(|| format!("unknown company {company}"))?;

            let summaries = load_summaries(&pool, Some(company), None, !all_assessments).await?;
            let overall = readiness::aggregate(AggregateScope::Company(company), &summaries);
            let families = readiness::aggregate_by_family(&summaries);

            let records = db::fetch_xp_records(&pool, Some(company)).await?;
            let departments = db::fetch_departments(&pool, company).await?;
            let department_board =
                leaderboard::rank_entities(&leaderboard::rollup_departments(&records, &departments));
            let employee_board = leaderboard::rank_employees(&records, config.leaderboard_limit);

            let report = report::build_report(
                &label,
                &overall,
                &families,
                &summaries,
                &department_board,
                &employee_board,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn summarize_assessment(
    pool: &PgPool,
    record: &models::AssessmentRecord,
) -> anyhow::Result<RoleGapSummary> {
    let requirements = db::fetch_requirements(pool, record.role_id).await?;
    let answers = db::fetch_answers(pool, record.id).await?;
    Ok(summary::summarize_role(
        record.role_id,
        &record.role_title,
        &record.function_name,
        &requirements,
        &answers,
    ))
}

/// One summary per completed assessment in scope, or only the latest per role.
async fn load_summaries(
    pool: &PgPool,
    company: Option<Uuid>,
    department: Option<Uuid>,
    latest_only: bool,
) -> anyhow::Result<Vec<RoleGapSummary>> {
    let assessments = db::fetch_assessments(pool, company, department).await?;
    let selected: Vec<&models::AssessmentRecord> = if latest_only {
        readiness::select_latest_per_role(&assessments)
    } else {
        assessments
            .iter()
            .filter(|a| a.completed_at.is_some())
            .collect()
    };

    let mut summaries = Vec::with_capacity(selected.len());
    for record in selected {
        summaries.push(summarize_assessment(pool, record).await?);
    }
    info!(
        assessments = assessments.len(),
        summarized = summaries.len(),
        "loaded role summaries"
    );
    Ok(summaries)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
