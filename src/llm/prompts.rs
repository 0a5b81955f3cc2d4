use crate::merge::CONTINUATION_MARKER;
use crate::minutes::MeetingInfo;

/// Placeholder the correction template substitutes the chunk into
pub const TEXT_PLACEHOLDER: &str = "{texto}";

/// Default correction prompt for noisy meeting-audio transcripts
pub const CORRECTION_PROMPT: &str = r#"Corrige y reescribe párrafos provenientes de audio con ruido.
Estilo: Primera persona, registro oral natural y coherente, sin adornos.
Reglas:

Mantén el orden exacto del documento de entrada.

Conserva etiquetas de hablante si existen (ej.: "INTERVIENE …:").

Repara gramática, puntuación y muletillas; elimina repeticiones.

No inventes datos: si algo es inaudible, marca [inaudible].

No cambies el sentido; resume solo lo redundante.

Mantén formato de párrafo por intervención.
Salida: Texto corregido, en primera persona, listo para pegar en el acta. {texto}"#;

/// Structure the drafted minutes must follow
pub const MINUTES_PROMPT: &str = r#"Eres un asistente experto en redactar actas formales de comités de evaluación y seguimiento.

Debes generar un acta **siguiendo exactamente esta estructura y formato**.

**CIUDAD Y FECHA:** [Extraer o inferir]
**HORA INICIO:** [Extraer o inferir en formato HH:MM (24h)]
**HORA FIN:** [Extraer o inferir en formato HH:MM (24h)]
**LUGAR:** [Extraer o inferir]

## OBJETIVO(S) DE LA REUNIÓN:
[Caso analizado, programa y número de ficha]

## PARTICIPANTES
- **COORDINACIÓN ACADÉMICA:** [Nombre]
- **INSTRUCTORES:** [Lista de instructores]
- **APRENDIZ CITADO:** [Nombre del aprendiz]
- **VOCERO:** [Nombre]

### 3. HECHOS QUE SERÁN OBJETO DE ESTUDIO EN EL COMITÉ
[Enumera cada hecho con números consecutivos, un párrafo por hecho, con fechas, fallas y evidencias reportadas por los instructores.]

### 5. DESARROLLO DEL COMITÉ / ANALISIS DEL CASO, DESCARGOS DEL APRENDIZ Y PRÁCTICA DE PRUEBAS A QUE HAYA LUGAR
[Intervenciones de los participantes con el formato: **INTERVIENE [Cargo y nombre]:** y lo dicho en el renglón siguiente, en tercera persona. Corrige la coherencia de los párrafos sin cambiar su sentido.]

### 6. CONCLUSIONES
[Tipo de falta, gravedad, medidas y planes de mejoramiento, resumidos.]

## COMPROMISOS Y SEGUIMIENTO

| Actividad/Decisión | Fecha Límite | Responsable |
|-------------------|--------------|-------------|
| [Compromiso 1]     | [Fecha]      | [Nombre]    |

## INSTRUCCIONES ADICIONALES:
- Usa **tercera persona** y lenguaje formal.
- **No inventes contenido** si no está en la transcripción.
- Si falta algún dato, realiza la mejor inferencia posible o deja el campo vacío.
- Respeta **el orden y títulos exactos** del formato.
- Usa Markdown correctamente (títulos con #, negritas con **).
- Resume las conclusiones, no copies textualmente lo que dicen los participantes.

Ahora redacta el acta en formato Markdown con base en la siguiente transcripción."#;

/// Follow-up sent as the second call of the two-part generation flow
pub const CONTINUE_INSTRUCTION: &str = "Continúa la redacción del acta justo donde quedó la etiqueta <<CONTINUAR>> y termina el documento.";

/// Substitute a chunk into a correction template. Templates without the
/// placeholder get the chunk appended, so a custom prompt can never lose
/// its input text.
pub fn render_correction_prompt(template: &str, chunk: &str) -> String {
    if template.contains(TEXT_PLACEHOLDER) {
        template.replace(TEXT_PLACEHOLDER, chunk)
    } else {
        format!("{} {}", template, chunk)
    }
}

/// Build the first prompt of the two-part minutes generation
pub fn build_minutes_prompt(transcript: &str, info: &MeetingInfo) -> String {
    let mut prompt = String::new();

    prompt.push_str(MINUTES_PROMPT);
    prompt.push_str("\n\nTRANSCRIPCIÓN DEL COMITÉ QUE NECESITO PROCESAR:\n");
    prompt.push_str(transcript);

    prompt.push_str("\n\nINFORMACIÓN ADICIONAL QUE DETECTÉ:\n");
    prompt.push_str(&format!(
        "- Programa Académico: {}\n",
        info.program.as_deref().unwrap_or("Por determinar")
    ));
    prompt.push_str(&format!(
        "- Número de Ficha: {}\n",
        info.file_number.as_deref().unwrap_or("Por determinar")
    ));
    prompt.push_str(&format!("- Fecha del Comité: {}\n", info.meeting_date));
    prompt.push_str(&format!(
        "- Aprendiz Principal: {}\n",
        info.trainee.as_deref().unwrap_or("Extraer de la transcripción")
    ));
    prompt.push_str(&format!("- Número de Acta: {}\n", info.serial));

    prompt.push_str(&format!(
        "\nPor favor escribe la primera mitad del acta. Finaliza con la etiqueta {} si falta texto.",
        CONTINUATION_MARKER
    ));

    prompt
}
