use anyhow::Result;
use tracing::info;

use crate::llm::{build_minutes_prompt, ChatSession, TextBackend, CONTINUE_INSTRUCTION};
use crate::merge::merge_parts;
use crate::minutes::MeetingInfo;

/// Draft the minutes in two sequential calls within one conversation.
///
/// The first call is asked to close with the continuation marker if its
/// draft is incomplete; the second call continues from the marker. The two
/// responses are fused by the overlap resolver. Unlike chunked correction
/// there is no per-unit recovery here: with only two calls at stake, any
/// backend failure aborts the whole generation and propagates to the
/// caller.
pub async fn generate_minutes<B: TextBackend>(
    backend: &B,
    transcript: &str,
    info: &MeetingInfo,
) -> Result<String> {
    let prompt = build_minutes_prompt(transcript, info);
    let mut session = ChatSession::new();

    let first = backend.generate_in_session(&mut session, &prompt).await?;
    info!("first draft: {} characters", first.text.len());

    let second = backend
        .generate_in_session(&mut session, CONTINUE_INSTRUCTION)
        .await?;
    info!("continuation: {} characters", second.text.len());

    let minutes = merge_parts(&first.text, &second.text);
    info!("merged minutes: {} characters", minutes.len());

    Ok(minutes)
}
