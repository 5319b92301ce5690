use serde::{Deserialize, Serialize};

use crate::llm_client::GatewayError;

/// A role the profile fits well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CareerMatch {
    pub role: String,
    pub industry: String,
    pub match_percentage: f64,
}

/// Simulated ATS evaluation of a CV. All scores are in [0, 100].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AtsAnalysis {
    pub overall_score: f64,
    pub keyword_match: f64,
    pub formatting_score: f64,
    pub impact_score: f64,
    pub found_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub critical_issues: Vec<String>,
    pub improvement_suggestions: Vec<String>,
    pub career_matches: Vec<CareerMatch>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    #[serde(rename = "markdownCV")]
    pub markdown_cv: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TailoredResult {
    #[serde(rename = "markdownCV")]
    pub markdown_cv: String,
    pub match_score: f64,
    pub changes_made: Vec<String>,
}

/// Out-of-range scores are a contract violation, never clamped.
fn check_score(field: &str, value: f64) -> Result<(), GatewayError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(GatewayError::SchemaMismatch(format!(
            "{field} = {value} is outside [0, 100]"
        )))
    }
}

impl AtsAnalysis {
    pub fn validate(&self) -> Result<(), GatewayError> {
        check_score("overallScore", self.overall_score)?;
        check_score("keywordMatch", self.keyword_match)?;
        check_score("formattingScore", self.formatting_score)?;
        check_score("impactScore", self.impact_score)?;
        for (i, m) in self.career_matches.iter().enumerate() {
            check_score(&format!("careerMatches[{i}].matchPercentage"), m.match_percentage)?;
        }
        Ok(())
    }
}

impl TailoredResult {
    pub fn validate(&self) -> Result<(), GatewayError> {
        check_score("matchScore", self.match_score)
    }
}

/// Rubric band of an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Poor,
    Average,
    Good,
    Excellent,
}

impl ScoreBand {
    /// <50 poor, 50–70 average, 71–89 good, 90–100 excellent.
    /// Fractional scores between bands round down into the lower band.
    pub fn from_score(score: f64) -> Self {
        if score < 50.0 {
            ScoreBand::Poor
        } else if score < 71.0 {
            ScoreBand::Average
        } else if score < 90.0 {
            ScoreBand::Good
        } else {
            ScoreBand::Excellent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Poor => "Deficiente",
            ScoreBand::Average => "Promedio",
            ScoreBand::Good => "Bueno",
            ScoreBand::Excellent => "Excelente",
        }
    }
}
