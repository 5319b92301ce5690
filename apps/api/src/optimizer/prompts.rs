// Prompt constants for the CV optimizer. Output shape is enforced by the
// response schema in gateway.rs, so prompts describe content only.

/// ATS scoring rubric.
pub const ATS_SYSTEM: &str = "\
Actúa como el motor de evaluación de un Applicant Tracking System corporativo \
(del tipo Taleo, Workday o Greenhouse). Evalúa el texto de un Currículum Vitae con rigor.

Criterios:
1. Legibilidad para máquinas: penaliza tablas, columnas, gráficos e íconos.
2. Densidad de palabras clave relevantes para la industria que se desprende del perfil.
3. Verbos de acción y resultados cuantificables.
4. Estructura estándar: Perfil, Experiencia, Educación, Habilidades.

Escala de puntajes (0 a 100):
- menos de 50: deficiente
- 50 a 70: promedio
- 71 a 89: bueno
- 90 a 100: excelente

Sé crítico: un CV típico está entre 40 y 60. Todos los puntajes deben ser números entre 0 y 100.
Sugiere entre 3 y 4 cargos (con su industria y porcentaje de ajuste) donde el perfil calce bien.";

/// Analysis prompt. Replace `{cv_text}` before sending.
pub const ANALYZE_PROMPT_TEMPLATE: &str = "Analiza el siguiente texto de CV de forma objetiva:

{cv_text}";

/// Rewrite rules for the general optimization pass.
pub const OPTIMIZER_SYSTEM: &str = "\
Eres un redactor experto en CVs optimizados para ATS. Reescribe el contenido en Markdown limpio y jerárquico.

Reglas:
1. Sin tablas ni columnas.
2. `#` para el nombre, `##` para cada sección.
3. Convierte párrafos densos en viñetas breves.
4. Cuantifica logros cuando el texto lo permita; si no, destaca la acción.
5. Incluye una sección \"Habilidades Técnicas\" rica en palabras clave.
6. Tono profesional y directo. No inventes experiencia que no esté en el original.";

/// Optimization prompt. Replace `{cv_text}` and `{suggestions}` before sending.
pub const OPTIMIZE_PROMPT_TEMPLATE: &str = "CV original:
{cv_text}

Puntos a mejorar según el análisis ATS previo:
{suggestions}

Genera el CV optimizado en Markdown y una breve explicación de la estrategia.
El campo markdownCV debe ser Markdown plano, sin bloques de código.";

/// Rules for adapting a CV to one job posting.
pub const TAILOR_SYSTEM: &str = "\
Eres un especialista en reclutamiento que adapta CVs a una descripción de trabajo concreta.

1. Identifica las habilidades técnicas y blandas críticas del aviso.
2. Reescribe el Perfil Profesional para alinearlo con la misión del puesto.
3. Ajusta las viñetas de experiencia para resaltar logros relacionados con los requisitos.
4. Integra las palabras clave del aviso de forma natural.
5. Devuelve el CV completo en Markdown, el nuevo puntaje de coincidencia (0 a 100) \
y la lista de cambios estratégicos realizados.";

/// Tailoring prompt. Replace `{cv_text}` and `{job_description}` before sending.
pub const TAILOR_PROMPT_TEMPLATE: &str = "CV actual:
{cv_text}

Descripción del trabajo:
{job_description}

Adapta el CV al aviso. Devuelve Markdown limpio, sin bloques de código.";

/// Substitutes `{key}` placeholders in one left-to-right pass over the
/// template. Substituted values are never scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = values.iter().find(|(key, _)| {
            tail[1..]
                .strip_prefix(key)
                .map_or(false, |after| after.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn analyze_prompt(cv_text: &str) -> String {
    fill_template(ANALYZE_PROMPT_TEMPLATE, &[("cv_text", cv_text)])
}

/// `suggestions` is embedded as a JSON array.
pub fn optimize_prompt(cv_text: &str, suggestions: &[String]) -> String {
    let suggestions = serde_json::to_string(suggestions).unwrap_or_else(|_| "[]".to_string());
    fill_template(
        OPTIMIZE_PROMPT_TEMPLATE,
        &[("cv_text", cv_text), ("suggestions", suggestions.as_str())],
    )
}

pub fn tailor_prompt(cv_markdown: &str, job_description: &str) -> String {
    fill_template(
        TAILOR_PROMPT_TEMPLATE,
        &[("cv_text", cv_markdown), ("job_description", job_description)],
    )
}
