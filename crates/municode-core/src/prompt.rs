//! Prompt construction for retrieval-augmented chat

use crate::SearchRecord;

/// Join the chunk texts of `records` into a single context block
///
/// Chunks are separated by a blank line. Records without text contribute an
/// empty string rather than being dropped, so positions stay aligned with the
/// references table.
pub fn build_context(records: &[SearchRecord]) -> String {
    records
        .iter()
        .map(|record| record.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap the retrieved context and the user's question in the instruction block
pub fn build_prompt(question: &str, records: &[SearchRecord]) -> String {
    let context = build_context(records);

    format!(
        "[INST]\n\
        You are a helpful AI assistant with RAG capabilities.\n\
        Use the context below to answer the question concisely and accurately.\n\
        If the answer is not in the context, say \"I don't know the answer\".\n\
        \n\
        <context>\n\
        {}\n\
        </context>\n\
        <question>\n\
        {}\n\
        </question>\n\
        [/INST]\n\
        Answer:",
        context, question
    )
}
