//! Workflow orchestration: the product steps built from gateway calls.

use serde::Serialize;
use tracing::{error, info};

use crate::errors::{AppError, PROCESS_FAILED_MESSAGE, TAILOR_FAILED_MESSAGE};
use crate::optimizer::gateway::CvGateway;
use crate::optimizer::models::{AtsAnalysis, OptimizationResult, TailoredResult};
use crate::optimizer::validation::{validate_cv_text, validate_job_description};

/// Output of the "process CV" action: the analysis and the rewrite built on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedCv {
    pub analysis: AtsAnalysis,
    pub optimization: OptimizationResult,
}

/// Analyze, then immediately optimize with the fresh analysis.
/// Either failure fails the whole action; nothing partial is returned.
pub async fn process_cv(gateway: &dyn CvGateway, cv_text: &str) -> Result<ProcessedCv, AppError> {
    validate_cv_text(cv_text)?;

    let analysis = gateway.analyze(cv_text).await.map_err(|e| {
        error!("CV analysis failed: {e}");
        AppError::gateway(e, PROCESS_FAILED_MESSAGE)
    })?;

    let optimization = gateway.optimize(cv_text, &analysis).await.map_err(|e| {
        error!("CV optimization failed after analysis: {e}");
        AppError::gateway(e, PROCESS_FAILED_MESSAGE)
    })?;

    info!(
        "Processed CV: score {}, {} suggestions",
        analysis.overall_score,
        analysis.improvement_suggestions.len()
    );
    Ok(ProcessedCv {
        analysis,
        optimization,
    })
}

/// Rewrites an optimized CV for one job posting.
pub async fn tailor_cv(
    gateway: &dyn CvGateway,
    optimized_markdown: &str,
    job_description: &str,
) -> Result<TailoredResult, AppError> {
    validate_job_description(job_description)?;

    let tailored = gateway
        .tailor(optimized_markdown, job_description)
        .await
        .map_err(|e| {
            error!("CV tailoring failed: {e}");
            AppError::gateway(e, TAILOR_FAILED_MESSAGE)
        })?;

    info!(
        "Tailored CV: match score {}, {} changes",
        tailored.match_score,
        tailored.changes_made.len()
    );
    Ok(tailored)
}
