//! Export formats: Markdown download, Word-compatible `.doc` HTML, and the
//! printable analysis report.

use std::fmt::Write as _;

use pulldown_cmark::{html, Options, Parser};
use serde::Deserialize;

use crate::optimizer::models::{AtsAnalysis, ScoreBand};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportVariant {
    #[default]
    Optimized,
    Tailored,
}

impl ExportVariant {
    pub fn file_stem(self) -> &'static str {
        match self {
            ExportVariant::Optimized => "cv_optimizado",
            ExportVariant::Tailored => "cv_personalizado",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ExportVariant::Optimized => "Versión Optimizada para ATS",
            ExportVariant::Tailored => "CV Personalizado al Cargo",
        }
    }
}

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";
pub const WORD_CONTENT_TYPE: &str = "application/msword";

/// Page setup for the `.doc` export: US letter, 1in margins, fixed type rules.
const WORD_STYLES: &str = "\
@page WordSection1 { size: 8.5in 11.0in; margin: 1.0in 1.0in 1.0in 1.0in; }
div.WordSection1 { page: WordSection1; }
body { font-family: Calibri, Arial, sans-serif; font-size: 11pt; line-height: 1.15; color: #000000; }
h1 { font-size: 20pt; font-weight: bold; margin: 0 0 6pt 0; }
h2 { font-size: 14pt; font-weight: bold; margin: 14pt 0 4pt 0; border-bottom: 1px solid #444444; }
h3 { font-size: 12pt; font-weight: bold; margin: 10pt 0 2pt 0; }
p { margin: 0 0 6pt 0; }
ul { margin: 2pt 0 6pt 0; }
li { margin-bottom: 2pt; }";

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Wraps the rendered CV in markup Word opens as a document.
pub fn word_document(markdown: &str, title: &str) -> String {
    format!(
        "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
xmlns:w='urn:schemas-microsoft-com:office:word' \
xmlns='http://www.w3.org/TR/REC-html40'>\n\
<head><meta charset='utf-8'><title>{title}</title>\n<style>\n{WORD_STYLES}\n</style></head>\n\
<body><div class='WordSection1'>\n{body}</div></body></html>\n",
        title = escape_html(title),
        body = markdown_to_html(markdown),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// `attachment; filename="<stem>.<ext>"`
pub fn attachment_header(variant: ExportVariant, extension: &str) -> String {
    format!(
        "attachment; filename=\"{}.{extension}\"",
        variant.file_stem()
    )
}

fn push_list(out: &mut String, heading: &str, items: &[String], empty: &str) {
    let _ = writeln!(out, "## {heading}\n");
    if items.is_empty() {
        let _ = writeln!(out, "_{empty}_\n");
        return;
    }
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    out.push('\n');
}

/// The detailed ATS report as Markdown, ready to print.
pub fn analysis_report(analysis: &AtsAnalysis) -> String {
    let mut out = String::new();
    let band = ScoreBand::from_score(analysis.overall_score);

    out.push_str("# Reporte ATS Detallado\n\n");
    let _ = writeln!(
        out,
        "**Puntaje general:** {:.0}/100 ({})\n",
        analysis.overall_score,
        band.label()
    );

    out.push_str("## Desglose por Categoría\n\n");
    out.push_str("| Categoría | Puntaje |\n|---|---|\n");
    for (label, score) in [
        ("Palabras clave", analysis.keyword_match),
        ("Formato", analysis.formatting_score),
        ("Impacto", analysis.impact_score),
    ] {
        let _ = writeln!(out, "| {label} | {score:.0} |");
    }
    out.push('\n');

    let _ = writeln!(out, "## Resumen Ejecutivo\n\n{}\n", analysis.summary.trim());

    out.push_str("## Cargos Sugeridos\n\n");
    if analysis.career_matches.is_empty() {
        out.push_str("_Sin sugerencias._\n\n");
    } else {
        for m in &analysis.career_matches {
            let _ = writeln!(
                out,
                "- **{}** ({}): {:.0}%",
                m.role, m.industry, m.match_percentage
            );
        }
        out.push('\n');
    }

    out.push_str("## Sugerencias de Mejora\n\n");
    for (i, suggestion) in analysis.improvement_suggestions.iter().enumerate() {
        let _ = writeln!(out, "{}. {suggestion}", i + 1);
    }
    out.push('\n');

    push_list(
        &mut out,
        "Problemas Críticos",
        &analysis.critical_issues,
        "No se detectaron problemas críticos.",
    );
    push_list(
        &mut out,
        "Palabras Clave Encontradas",
        &analysis.found_keywords,
        "Ninguna.",
    );
    push_list(
        &mut out,
        "Palabras Clave Faltantes (Recomendadas)",
        &analysis.missing_keywords,
        "Ninguna.",
    );

    out.trim_end().to_string() + "\n"
}
