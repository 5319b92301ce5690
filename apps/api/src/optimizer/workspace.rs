//! Per-user application state: the CV being worked on and every result
//! derived from it. Lives only inside a session; logout drops it.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::optimizer::models::{AtsAnalysis, OptimizationResult, TailoredResult};
use crate::optimizer::workflow::ProcessedCv;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Input,
    Analyzing,
    Results,
    Tailoring,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub step: Step,
    pub cv_text: String,
    pub analysis: Option<AtsAnalysis>,
    pub optimization: Option<OptimizationResult>,
    pub job_description: String,
    pub tailored: Option<TailoredResult>,
    /// An analyze or tailor call is in flight.
    pub processing: bool,
}

impl Workspace {
    fn ensure_idle(&self) -> Result<(), AppError> {
        if self.processing {
            return Err(AppError::Conflict(
                "Ya hay un procesamiento en curso.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn begin_analysis(&mut self, cv_text: &str) -> Result<(), AppError> {
        self.ensure_idle()?;
        self.cv_text = cv_text.to_string();
        self.step = Step::Analyzing;
        self.processing = true;
        Ok(())
    }

    /// The tailored result is dropped: it was derived from the previous optimization.
    pub fn complete_analysis(&mut self, processed: ProcessedCv) {
        self.analysis = Some(processed.analysis);
        self.optimization = Some(processed.optimization);
        self.tailored = None;
        self.step = Step::Results;
        self.processing = false;
    }

    /// No partial results survive a failed analyze → optimize action.
    pub fn fail_analysis(&mut self) {
        self.analysis = None;
        self.optimization = None;
        self.tailored = None;
        self.step = Step::Input;
        self.processing = false;
    }

    /// Returns the optimized Markdown to tailor.
    pub fn begin_tailoring(&mut self, job_description: &str) -> Result<String, AppError> {
        self.ensure_idle()?;
        let markdown = self
            .optimization
            .as_ref()
            .map(|o| o.markdown_cv.clone())
            .ok_or_else(|| {
                AppError::Conflict("Primero debes analizar y optimizar un CV.".to_string())
            })?;
        self.job_description = job_description.to_string();
        self.step = Step::Tailoring;
        self.processing = true;
        Ok(markdown)
    }

    pub fn complete_tailoring(&mut self, tailored: TailoredResult) {
        self.tailored = Some(tailored);
        self.processing = false;
    }

    /// Failure is reported in place; the previous tailored result stays.
    pub fn fail_tailoring(&mut self) {
        self.processing = false;
    }

    /// Navigation between views. `Analyzing` is only ever entered by `begin_analysis`.
    pub fn go_to(&mut self, step: Step) -> Result<(), AppError> {
        self.ensure_idle()?;
        match step {
            Step::Input => {}
            Step::Results | Step::Tailoring if self.optimization.is_some() => {}
            Step::Results | Step::Tailoring => {
                return Err(AppError::Conflict(
                    "No hay resultados disponibles todavía.".to_string(),
                ))
            }
            Step::Analyzing => {
                return Err(AppError::Validation(
                    "No se puede navegar al paso de análisis.".to_string(),
                ))
            }
        }
        self.step = step;
        Ok(())
    }
}
