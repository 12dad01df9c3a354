//! Validate command implementation

use crate::config::ValidatorConfig;
use crate::monitor::{TracingErrorReporter, TracingEventBus};
use crate::validation::{
    FactorRule, PredictionInput, PredictionOutput, PredictionValidator, TimestampRule,
    UncertaintyRule, ValidationResult,
};
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file holding `{"input": ..., "output": ...}` or an array of them
    #[arg(long)]
    pub file: PathBuf,

    /// Also run timestamp, factor and uncertainty checks
    #[arg(long)]
    pub strict: bool,

    /// Print aggregate statistics after validating
    #[arg(long)]
    pub stats: bool,
}

/// One prediction to validate
#[derive(Debug, Deserialize)]
pub struct PredictionRecord {
    pub input: PredictionInput,
    pub output: PredictionOutput,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionFile {
    Many(Vec<PredictionRecord>),
    One(PredictionRecord),
}

impl ValidateArgs {
    pub async fn execute(&self, config: &ValidatorConfig) -> anyhow::Result<()> {
        let content = tokio::fs::read_to_string(&self.file).await?;
        let records = match serde_json::from_str(&content)? {
            PredictionFile::Many(records) => records,
            PredictionFile::One(record) => vec![record],
        };

        let mut validator = build_validator(config, self.strict)?;
        let results = validate_all(&mut validator, &records)?;
        println!("{}", serde_json::to_string_pretty(&results)?);

        if self.stats {
            let stats = validator.get_validation_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Ok(())
    }
}

fn build_validator(config: &ValidatorConfig, strict: bool) -> anyhow::Result<PredictionValidator> {
    let mut validator = PredictionValidator::new(
        config.clone(),
        Arc::new(TracingEventBus),
        Arc::new(TracingErrorReporter),
    )?;
    if strict {
        validator.add_validation_rule(Box::new(TimestampRule));
        validator.add_validation_rule(Box::new(FactorRule));
        validator.add_validation_rule(Box::new(UncertaintyRule));
    }
    Ok(validator)
}

fn validate_all(
    validator: &mut PredictionValidator,
    records: &[PredictionRecord],
) -> anyhow::Result<Vec<ValidationResult>> {
    let mut results = Vec::with_capacity(records.len());
    for record in records {
        results.push(validator.validate_prediction(&record.input, &record.output)?);
    }
    tracing::info!(count = results.len(), "Validated predictions");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_many() {
        let one = r#"{
            "input": {"features": {"xg_home": 1.4}},
            "output": {"prediction_id": "m1", "predicted_value": 0.6, "confidence": 0.8}
        }"#;
        let parsed: PredictionFile = serde_json::from_str(one).unwrap();
        assert!(matches!(parsed, PredictionFile::One(_)));

        let many = format!("[{one}, {one}]");
        let parsed: PredictionFile = serde_json::from_str(&many).unwrap();
        assert!(matches!(parsed, PredictionFile::Many(ref v) if v.len() == 2));
    }

    #[test]
    fn test_strict_validator_adds_rules() {
        let validator = build_validator(&ValidatorConfig::default(), true).unwrap();
        assert_eq!(validator.rule_names().len(), 7);
    }

    #[test]
    fn test_validate_all() {
        let mut validator = build_validator(&ValidatorConfig::default(), false).unwrap();
        let records = vec![
            PredictionRecord {
                input: PredictionInput::from_features([("xg", 1.2)]),
                output: PredictionOutput::new("a", 0.55, 0.9),
            },
            PredictionRecord {
                input: PredictionInput::default(),
                output: PredictionOutput::new("b", 0.55, 0.9),
            },
        ];

        let results = validate_all(&mut validator, &records).unwrap();
        assert!(results[0].is_valid);
        assert!(!results[1].is_valid);
    }
}
