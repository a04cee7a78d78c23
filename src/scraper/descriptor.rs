use serde::{Deserialize, Serialize};

use crate::job::JobField;

/// Declares, per provider, how each job field gets populated.
///
/// - `get_fields` are copied straight from the raw row during normalization
///   and may be listed in any order.
/// - `set_fields` are computed from the job itself, strictly in the declared
///   order. A field may read anything populated before it, including earlier
///   set fields, so reordering this list can change results.
/// - `delayed_fields` need a second fetch per job and only run once the whole
///   batch has been through the get and set phases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldPipeline {
    pub get_fields: Vec<JobField>,
    pub set_fields: Vec<JobField>,
    pub delayed_fields: Vec<JobField>,
}

impl FieldPipeline {
    pub fn with_set_fields(mut self, fields: Vec<JobField>) -> Self {
        self.set_fields = fields;
        self
    }

    pub fn gets(&self, field: JobField) -> bool {
        self.get_fields.contains(&field)
    }
}

impl Default for FieldPipeline {
    /// Pipeline shared by the providers backed by the search capability
    fn default() -> Self {
        Self {
            get_fields: vec![
                JobField::Title,
                JobField::Company,
                JobField::Description,
                JobField::Location,
                JobField::KeyId,
                JobField::Tags,
                JobField::PostDate,
                JobField::Wage,
            ],
            set_fields: vec![JobField::Url, JobField::Remoteness],
            delayed_fields: vec![JobField::Raw],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_sets_url_before_remoteness() {
        let pipeline = FieldPipeline::default();
        assert_eq!(pipeline.set_fields, vec![JobField::Url, JobField::Remoteness]);
        assert_eq!(pipeline.delayed_fields, vec![JobField::Raw]);
        assert!(pipeline.gets(JobField::Wage));
        assert!(!pipeline.gets(JobField::Remoteness));
    }
}
