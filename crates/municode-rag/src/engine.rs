//! Retrieval-augmented chat engine

use std::sync::Arc;
use tracing::{debug, info, warn};

use municode_core::{
    GenerationClient, Result, SearchClient, SearchRecord, SearchRequest, build_prompt,
};

use crate::render::{chat_response, escape_math};
use crate::session::ChatSession;

/// Outcome of one answered question
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Generated answer with `$` already escaped
    pub answer: String,
    pub records: Vec<SearchRecord>,
    /// Answer followed by the references table
    pub rendered: String,
}

/// Chat engine: retrieve chunks, build the prompt, generate, render
pub struct ChatEngine<S: SearchClient, G: GenerationClient> {
    search: Arc<S>,
    llm: Arc<G>,
}

impl<S: SearchClient, G: GenerationClient> ChatEngine<S, G> {
    /// Create a new chat engine
    pub fn new(search: Arc<S>, llm: Arc<G>) -> Self {
        Self { search, llm }
    }

    /// Answer `question` within `session`
    ///
    /// Blank questions are ignored and return `Ok(None)`. The user message is
    /// recorded before any backend call; the assistant message only after a
    /// successful generation, so a failure leaves the question unanswered in
    /// the history.
    pub async fn ask(&self, session: &mut ChatSession, question: &str) -> Result<Option<ChatTurn>> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        session.push_user(question);

        let request = SearchRequest::new(question, session.num_chunks())?;
        let records = self.search.search(&request).await?;
        debug!(session = %session.id(), chunks = records.len(), "retrieved context");

        let prompt = build_prompt(question, &records);
        let generated = match self.llm.complete(session.model(), &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(session = %session.id(), error = %e, "generation failed");
                return Err(e);
            }
        };

        let answer = escape_math(&generated);
        let rendered = chat_response(&answer, &records);
        session.push_assistant(answer.clone());
        info!(session = %session.id(), history = session.messages().len(), "question answered");

        Ok(Some(ChatTurn {
            answer,
            records,
            rendered,
        }))
    }

    pub fn service_name(&self) -> String {
        self.search.service_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedGeneration, ScriptedSearch, record};
    use municode_core::{Error, Model, Role};

    fn engine(
        records: Vec<SearchRecord>,
        llm: ScriptedGeneration,
    ) -> (ChatEngine<ScriptedSearch, ScriptedGeneration>, Arc<ScriptedSearch>, Arc<ScriptedGeneration>) {
        let search = Arc::new(ScriptedSearch::new(records));
        let llm = Arc::new(llm);
        (ChatEngine::new(search.clone(), llm.clone()), search, llm)
    }

    #[tokio::test]
    async fn test_blank_question_is_a_no_op() {
        let (engine, search, _) = engine(vec![], ScriptedGeneration::answering("unused"));
        let mut session = ChatSession::new(Model::default(), 5).unwrap();

        assert!(engine.ask(&mut session, "   ").await.unwrap().is_none());
        assert!(session.messages().is_empty());
        assert!(search.requests().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_orders_chunks_before_question() {
        let (engine, search, llm) = engine(
            vec![
                record("Chickens are permitted.", "a.pdf", "http://a", ""),
                record("Roosters are prohibited.", "b.pdf", "", "http://b"),
            ],
            ScriptedGeneration::answering("Hens only."),
        );
        let mut session = ChatSession::new(Model::Llama31_70b, 2).unwrap();

        let turn = engine
            .ask(&mut session, "Can I keep chickens?")
            .await
            .unwrap()
            .unwrap();

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        let (model, prompt) = &prompts[0];
        assert_eq!(*model, Model::Llama31_70b);

        let context = prompt
            .find("Chickens are permitted.\n\nRoosters are prohibited.")
            .unwrap();
        assert!(context < prompt.find("Can I keep chickens?").unwrap());

        assert_eq!(search.requests()[0].limit, 2);
        assert_eq!(turn.records.len(), 2);
    }

    #[tokio::test]
    async fn test_answer_is_escaped_and_recorded() {
        let (engine, _, _) = engine(
            vec![record("Fines start at $100.", "fines.pdf", "http://f", "")],
            ScriptedGeneration::answering("The fine is $100."),
        );
        let mut session = ChatSession::new(Model::default(), 5).unwrap();

        let turn = engine.ask(&mut session, "What is the fine?").await.unwrap().unwrap();

        assert_eq!(turn.answer, "The fine is \\$100.");
        assert!(turn.rendered.starts_with("The fine is \\$100.\n\n###### References"));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].role, Role::Assistant);
        assert_eq!(session.messages()[1].content, "The fine is \\$100.");
    }

    #[tokio::test]
    async fn test_failed_generation_leaves_user_message() {
        let (engine, _, _) = engine(
            vec![record("text", "a.pdf", "", "")],
            ScriptedGeneration::failing("model overloaded"),
        );
        let mut session = ChatSession::new(Model::default(), 5).unwrap();

        let err = engine.ask(&mut session, "Is parking free?").await.unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_search_failure_skips_generation() {
        let search = Arc::new(ScriptedSearch::failing());
        let llm = Arc::new(ScriptedGeneration::answering("unused"));
        let engine = ChatEngine::new(search, llm.clone());
        let mut session = ChatSession::new(Model::default(), 5).unwrap();

        assert!(engine.ask(&mut session, "anything").await.is_err());
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_generates_with_notice() {
        let (engine, _, llm) = engine(vec![], ScriptedGeneration::answering("I don't know the answer"));
        let mut session = ChatSession::new(Model::default(), 5).unwrap();

        let turn = engine.ask(&mut session, "Who won in 1920?").await.unwrap().unwrap();

        assert!(llm.prompts()[0].1.contains("<context>\n\n</context>"));
        assert!(turn.rendered.ends_with(crate::NO_RESULTS));
    }
}
