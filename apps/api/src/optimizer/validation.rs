use crate::errors::AppError;

/// Minimum trimmed CV length, in characters.
pub const MIN_CV_CHARS: usize = 100;

/// Rejects empty or too-short CV text before any model call.
/// Length is counted in characters, not bytes.
pub fn validate_cv_text(cv_text: &str) -> Result<(), AppError> {
    let len = cv_text.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation(
            "Pega el contenido de tu CV antes de analizar.".to_string(),
        ));
    }
    if len < MIN_CV_CHARS {
        let missing = MIN_CV_CHARS - len;
        return Err(AppError::Validation(format!(
            "El CV es demasiado corto: mínimo {MIN_CV_CHARS} caracteres (faltan {missing})."
        )));
    }
    Ok(())
}

pub fn validate_job_description(job_description: &str) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Pega la descripción del trabajo antes de personalizar.".to_string(),
        ));
    }
    Ok(())
}
