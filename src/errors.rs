use thiserror::Error;
use uuid::Uuid;

/// Rejections raised while loading requirement catalogs and answer sets.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("requirements for role {role_id} are locked: answers already exist")]
    RequirementsLocked { role_id: Uuid },

    #[error("skill {skill_id} has non-positive weight {weight}")]
    InvalidWeight { skill_id: String, weight: f64 },

    #[error("duplicate requirement for skill {skill_id} on role {role_id}")]
    DuplicateRequirement { role_id: Uuid, skill_id: String },

    #[error("unknown role {0}")]
    UnknownRole(Uuid),

    #[error("unknown assessment {0}")]
    UnknownAssessment(i64),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
