//! CV Gateway: the three model exchanges behind the optimizer.
//!
//! `AppState` holds an `Arc<dyn CvGateway>`; `GeminiCvGateway` is the
//! production backend. Every call is single-shot and stateless: callers pass
//! prior results forward explicitly.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::llm_client::schema::{array_of, number, object, string, string_array};
use crate::llm_client::{GatewayError, GenerationRequest, LlmClient};
use crate::optimizer::models::{AtsAnalysis, OptimizationResult, TailoredResult};
use crate::optimizer::prompts::{
    analyze_prompt, optimize_prompt, tailor_prompt, ATS_SYSTEM, OPTIMIZER_SYSTEM, TAILOR_SYSTEM,
};

/// Scoring must be as stable as the model allows.
pub const ANALYZE_TEMPERATURE: f32 = 0.0;
/// Rewriting trades a little variability for fluency.
pub const REWRITE_TEMPERATURE: f32 = 0.2;

#[async_trait]
pub trait CvGateway: Send + Sync {
    async fn analyze(&self, cv_text: &str) -> Result<AtsAnalysis, GatewayError>;

    async fn optimize(
        &self,
        cv_text: &str,
        analysis: &AtsAnalysis,
    ) -> Result<OptimizationResult, GatewayError>;

    async fn tailor(
        &self,
        cv_markdown: &str,
        job_description: &str,
    ) -> Result<TailoredResult, GatewayError>;
}

pub fn analysis_schema() -> Value {
    object(&[
        ("overallScore", number("Puntaje general del 0 al 100")),
        ("keywordMatch", number("Coincidencia de palabras clave (0-100)")),
        ("formattingScore", number("Formato y estructura (0-100)")),
        ("impactScore", number("Impacto y métricas (0-100)")),
        ("foundKeywords", string_array("Palabras clave importantes encontradas")),
        (
            "missingKeywords",
            string_array("Palabras clave que faltan y son comunes en este perfil"),
        ),
        (
            "criticalIssues",
            string_array("Problemas graves que impiden la lectura del ATS"),
        ),
        (
            "improvementSuggestions",
            string_array("Sugerencias concretas de mejora"),
        ),
        (
            "careerMatches",
            array_of(
                object(&[
                    ("role", string("Cargo sugerido")),
                    ("industry", string("Industria aplicable")),
                    ("matchPercentage", number("Porcentaje de ajuste al perfil (0-100)")),
                ]),
                "Entre 3 y 4 cargos donde el perfil calza bien",
            ),
        ),
        ("summary", string("Resumen ejecutivo del análisis")),
    ])
}

pub fn optimization_schema() -> Value {
    object(&[
        ("markdownCV", string("El CV completo reescrito en Markdown limpio")),
        ("rationale", string("Breve explicación de la estrategia de optimización")),
    ])
}

pub fn tailored_schema() -> Value {
    object(&[
        ("markdownCV", string("El CV completo adaptado, en Markdown limpio")),
        ("matchScore", number("Nuevo puntaje de coincidencia con el aviso (0-100)")),
        ("changesMade", string_array("Cambios estratégicos realizados")),
    ])
}

/// Gemini-backed gateway. Schemas are built once at construction.
pub struct GeminiCvGateway {
    llm: LlmClient,
    analysis_schema: Value,
    optimization_schema: Value,
    tailored_schema: Value,
}

impl GeminiCvGateway {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            analysis_schema: analysis_schema(),
            optimization_schema: optimization_schema(),
            tailored_schema: tailored_schema(),
        }
    }
}

#[async_trait]
impl CvGateway for GeminiCvGateway {
    async fn analyze(&self, cv_text: &str) -> Result<AtsAnalysis, GatewayError> {
        let prompt = analyze_prompt(cv_text);
        let analysis: AtsAnalysis = self
            .llm
            .call_json(GenerationRequest {
                contents: &prompt,
                system_instruction: ATS_SYSTEM,
                response_schema: &self.analysis_schema,
                temperature: ANALYZE_TEMPERATURE,
            })
            .await?;
        analysis.validate()?;
        info!("CV analyzed: overall score {}", analysis.overall_score);
        Ok(analysis)
    }

    async fn optimize(
        &self,
        cv_text: &str,
        analysis: &AtsAnalysis,
    ) -> Result<OptimizationResult, GatewayError> {
        let prompt = optimize_prompt(cv_text, &analysis.improvement_suggestions);
        let mut result: OptimizationResult = self
            .llm
            .call_json(GenerationRequest {
                contents: &prompt,
                system_instruction: OPTIMIZER_SYSTEM,
                response_schema: &self.optimization_schema,
                temperature: REWRITE_TEMPERATURE,
            })
            .await?;
        result.markdown_cv = strip_markdown_fences(&result.markdown_cv);
        Ok(result)
    }

    async fn tailor(
        &self,
        cv_markdown: &str,
        job_description: &str,
    ) -> Result<TailoredResult, GatewayError> {
        let prompt = tailor_prompt(cv_markdown, job_description);
        let mut result: TailoredResult = self
            .llm
            .call_json(GenerationRequest {
                contents: &prompt,
                system_instruction: TAILOR_SYSTEM,
                response_schema: &self.tailored_schema,
                temperature: REWRITE_TEMPERATURE,
            })
            .await?;
        result.validate()?;
        result.markdown_cv = strip_markdown_fences(&result.markdown_cv);
        Ok(result)
    }
}

const FENCE: &str = "```";

/// Removes code-fence markers the model wraps around Markdown despite
/// instructions. The result never starts or ends with "```".
pub fn strip_markdown_fences(text: &str) -> String {
    let mut out = text.trim();
    loop {
        let before = out.len();
        if let Some(rest) = out.strip_prefix(FENCE) {
            out = skip_info_string(rest).trim_start();
        }
        if let Some(rest) = out.strip_suffix(FENCE) {
            out = rest.trim_end();
        }
        if out.len() == before {
            return out.to_string();
        }
    }
}

/// Drops a language tag such as `markdown` or `md` on the opening fence line.
fn skip_info_string(rest: &str) -> &str {
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let tag = rest[..line_end].trim();
    let is_tag = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if is_tag {
        &rest[line_end..]
    } else {
        rest
    }
}
