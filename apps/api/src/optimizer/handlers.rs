//! Axum route handlers for the CV workflow and exports.

use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::session::UserSession;
use crate::errors::AppError;
use crate::optimizer::export::{
    analysis_report, attachment_header, word_document, ExportVariant, MARKDOWN_CONTENT_TYPE,
    WORD_CONTENT_TYPE,
};
use crate::optimizer::extract::extract_cv_text;
use crate::optimizer::validation::{validate_cv_text, validate_job_description};
use crate::optimizer::workflow::{process_cv, tailor_cv};
use crate::optimizer::workspace::{Step, Workspace};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub cv_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: Step,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub variant: ExportVariant,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub characters: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// Maps a crashed workflow task to an error after `reset` has cleared the
/// in-flight flag.
async fn recover_from_panic(
    state: &AppState,
    token: Uuid,
    err: JoinError,
    reset: impl FnOnce(&mut Workspace),
) -> AppError {
    error!("CV workflow task failed: {err}");
    if let Err(e) = state.sessions.with_workspace(token, reset).await {
        warn!("Could not reset workspace after task failure: {e}");
    }
    AppError::Internal(anyhow::anyhow!("CV workflow task failed: {err}"))
}

/// POST /api/v1/cv/analyze
///
/// Analyze + auto-optimize as one action. The registry lock is released while
/// the gateway runs; `processing` blocks duplicate submissions meanwhile.
/// The gateway call and its completion run in a spawned task, so a client
/// disconnect cannot leave the workspace stuck in `processing`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    UserSession(session): UserSession,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Workspace>, AppError> {
    validate_cv_text(&req.cv_text)?;

    let token = session.token;
    state
        .sessions
        .with_workspace(token, |ws| ws.begin_analysis(&req.cv_text))
        .await??;

    let sessions = state.sessions.clone();
    let gateway = state.gateway.clone();
    let task = tokio::spawn(async move {
        let outcome = process_cv(gateway.as_ref(), &req.cv_text).await;
        sessions
            .with_workspace(token, |ws| match outcome {
                Ok(processed) => {
                    ws.complete_analysis(processed);
                    Ok(ws.clone())
                }
                Err(e) => {
                    ws.fail_analysis();
                    Err(e)
                }
            })
            .await?
    });

    match task.await {
        Ok(workspace) => Ok(Json(workspace?)),
        Err(e) => Err(recover_from_panic(&state, token, e, Workspace::fail_analysis).await),
    }
}

/// POST /api/v1/cv/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    UserSession(session): UserSession,
    Json(req): Json<TailorRequest>,
) -> Result<Json<Workspace>, AppError> {
    validate_job_description(&req.job_description)?;

    let token = session.token;
    let optimized_markdown = state
        .sessions
        .with_workspace(token, |ws| ws.begin_tailoring(&req.job_description))
        .await??;

    let sessions = state.sessions.clone();
    let gateway = state.gateway.clone();
    let task = tokio::spawn(async move {
        let outcome = tailor_cv(gateway.as_ref(), &optimized_markdown, &req.job_description).await;
        sessions
            .with_workspace(token, |ws| match outcome {
                Ok(tailored) => {
                    ws.complete_tailoring(tailored);
                    Ok(ws.clone())
                }
                Err(e) => {
                    ws.fail_tailoring();
                    Err(e)
                }
            })
            .await?
    });

    match task.await {
        Ok(workspace) => Ok(Json(workspace?)),
        Err(e) => Err(recover_from_panic(&state, token, e, Workspace::fail_tailoring).await),
    }
}

/// GET /api/v1/cv/workspace
pub async fn handle_get_workspace(
    State(state): State<AppState>,
    UserSession(session): UserSession,
) -> Result<Json<Workspace>, AppError> {
    let workspace = state
        .sessions
        .with_workspace(session.token, |ws| ws.clone())
        .await?;
    Ok(Json(workspace))
}

/// POST /api/v1/cv/step
pub async fn handle_set_step(
    State(state): State<AppState>,
    UserSession(session): UserSession,
    Json(req): Json<StepRequest>,
) -> Result<Json<Workspace>, AppError> {
    let workspace = state
        .sessions
        .with_workspace(session.token, |ws| {
            ws.go_to(req.step)?;
            Ok::<_, AppError>(ws.clone())
        })
        .await??;
    Ok(Json(workspace))
}

fn markdown_for(ws: &Workspace, variant: ExportVariant) -> Result<String, AppError> {
    let markdown = match variant {
        ExportVariant::Optimized => ws.optimization.as_ref().map(|o| o.markdown_cv.clone()),
        ExportVariant::Tailored => ws.tailored.as_ref().map(|t| t.markdown_cv.clone()),
    };
    markdown.ok_or_else(|| AppError::NotFound("No hay un CV generado para exportar.".to_string()))
}

/// GET /api/v1/cv/export/markdown?variant=optimized|tailored
pub async fn handle_export_markdown(
    State(state): State<AppState>,
    UserSession(session): UserSession,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let markdown = state
        .sessions
        .with_workspace(session.token, |ws| markdown_for(ws, query.variant))
        .await??;

    Ok((
        [
            (header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_header(query.variant, "md"),
            ),
        ],
        markdown,
    ))
}

/// GET /api/v1/cv/export/doc?variant=optimized|tailored
pub async fn handle_export_doc(
    State(state): State<AppState>,
    UserSession(session): UserSession,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let markdown = state
        .sessions
        .with_workspace(session.token, |ws| markdown_for(ws, query.variant))
        .await??;

    Ok((
        [
            (header::CONTENT_TYPE, WORD_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment_header(query.variant, "doc"),
            ),
        ],
        word_document(&markdown, query.variant.title()),
    ))
}

/// GET /api/v1/cv/report
pub async fn handle_report(
    State(state): State<AppState>,
    UserSession(session): UserSession,
) -> Result<impl IntoResponse, AppError> {
    let report = state
        .sessions
        .with_workspace(session.token, |ws| {
            ws.analysis
                .as_ref()
                .map(analysis_report)
                .ok_or_else(|| AppError::NotFound("Aún no hay un análisis.".to_string()))
        })
        .await??;

    Ok(([(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], report))
}

/// POST /api/v1/cv/extract
///
/// Multipart upload; the `file` field is read as PDF or plain text.
pub async fn handle_extract(
    UserSession(_session): UserSession,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;

        let text = extract_cv_text(file_name.as_deref(), content_type.as_deref(), data).await?;
        return Ok(Json(ExtractResponse {
            characters: text.chars().count(),
            text,
        }));
    }

    Err(AppError::Validation(
        "Falta el archivo (campo 'file').".to_string(),
    ))
}
