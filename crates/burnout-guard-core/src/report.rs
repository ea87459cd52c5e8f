use std::fmt::Write;

use crate::predictor::RiskAssessment;

/// Format styles supported by the default renderer.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

const IMPORTANCE_BAR_WIDTH: usize = 40;

/// Produce a display string from a `RiskAssessment` using the desired format.
///
/// The importance section preserves canonical feature order and prints an
/// explicit notice when the model exposes no importances.
pub fn render_assessment(
    assessment: &RiskAssessment,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(assessment),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(assessment)?),
    }
}

fn render_human(assessment: &RiskAssessment) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Prediction: {} ({:?})",
        assessment.label, assessment.tier
    )?;
    writeln!(out, "{}", assessment.explanation)?;
    writeln!(out)?;

    match &assessment.importances {
        Some(importances) => {
            writeln!(out, "Why this prediction:")?;
            let max = importances
                .iter()
                .map(|pair| pair.score)
                .fold(0.0_f64, f64::max);
            for pair in importances {
                let fill = if max > 0.0 {
                    ((pair.score / max) * IMPORTANCE_BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                writeln!(
                    out,
                    "  {name:<16} {bar:<width$} {score:.3}",
                    name = pair.feature,
                    bar = "#".repeat(fill),
                    width = IMPORTANCE_BAR_WIDTH,
                    score = pair.score
                )?;
            }
        }
        None => {
            writeln!(out, "Feature importance not available for this model.")?;
        }
    }

    Ok(out)
}
