//! Faceted search session

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use municode_core::{
    AttributeSelection, Error, Result, SearchClient, SearchRecord, SearchRequest,
    ServiceDescription, build_filter,
};

use crate::render::{SearchResultsView, search_results};

/// Selectable excerpt lengths, in characters
pub const CONTEXT_LENGTH_OPTIONS: [usize; 5] = [100, 200, 400, 800, 1600];
pub const DEFAULT_CONTEXT_LENGTH: usize = 400;
pub const DEFAULT_LIMIT: usize = 5;

/// Last-entered search form values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    pub query: String,
    limit: usize,
    context_length: usize,
    pub attributes: AttributeSelection,
    pub array_attributes: BTreeSet<String>,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: DEFAULT_LIMIT,
            context_length: DEFAULT_CONTEXT_LENGTH,
            attributes: AttributeSelection::new(),
            array_attributes: BTreeSet::new(),
        }
    }
}

impl SearchForm {
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(Error::InvalidInput("result limit must be at least 1".to_string()));
        }
        self.limit = limit;
        Ok(())
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn set_context_length(&mut self, context_length: usize) -> Result<()> {
        if !CONTEXT_LENGTH_OPTIONS.contains(&context_length) {
            return Err(Error::InvalidInput(format!(
                "context length must be one of {:?}, got {}",
                CONTEXT_LENGTH_OPTIONS, context_length
            )));
        }
        self.context_length = context_length;
        Ok(())
    }
}

/// One search session: service metadata, form state and the last results
pub struct SearchSession<S: SearchClient> {
    client: Arc<S>,
    description: ServiceDescription,
    form: SearchForm,
    results: Vec<SearchRecord>,
}

impl<S: SearchClient> SearchSession<S> {
    /// Start a session, fetching the service description once
    pub async fn start(client: Arc<S>, form: SearchForm) -> Result<Self> {
        let description = client.describe().await?;
        info!(
            service = %client.service_name(),
            search_column = %description.search_column,
            attributes = description.attribute_columns.len(),
            "search service described"
        );

        Ok(Self {
            client,
            description,
            form,
            results: Vec::new(),
        })
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    pub fn service_name(&self) -> String {
        self.client.service_name()
    }

    pub fn form(&self) -> &SearchForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SearchForm {
        &mut self.form
    }

    /// Selected filter columns the service does not list as attributes
    pub fn unknown_filter_columns(&self) -> Vec<String> {
        self.form
            .attributes
            .columns()
            .filter(|c| !self.description.is_attribute(c))
            .map(str::to_string)
            .collect()
    }

    /// Run the current form; a blank query does nothing and returns `None`
    pub async fn run(&mut self) -> Result<Option<SearchResultsView>> {
        if self.form.query.trim().is_empty() {
            return Ok(None);
        }

        for column in self.unknown_filter_columns() {
            warn!(column = %column, "filter column is not an attribute column of the service");
        }

        let filter = build_filter(&self.form.attributes, &self.form.array_attributes);
        let request = SearchRequest::new(self.form.query.clone(), self.form.limit)?.with_filter(filter);

        self.results = self.client.search(&request).await?;
        Ok(Some(search_results(&self.results, self.form.context_length)))
    }

    pub fn results(&self) -> &[SearchRecord] {
        &self.results
    }

    /// Untruncated text of result `number` (1-based) from the last run
    pub fn full_text(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.results.get(i))
            .map(|record| record.chunk.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NO_RESULTS;
    use crate::fakes::{ScriptedSearch, record};
    use municode_core::FilterExpr;

    async fn session(records: Vec<SearchRecord>) -> (SearchSession<ScriptedSearch>, Arc<ScriptedSearch>) {
        let client = Arc::new(ScriptedSearch::new(records));
        let session = SearchSession::start(client.clone(), SearchForm::default())
            .await
            .unwrap();
        (session, client)
    }

    #[tokio::test]
    async fn test_description_fetched_once() {
        let (mut session, client) = session(vec![record("a", "a.pdf", "", "")]).await;
        session.form_mut().query = "zoning".to_string();
        session.run().await.unwrap();
        session.run().await.unwrap();

        assert_eq!(client.describe_calls(), 1);
        assert_eq!(session.description().search_column, "CHUNK");
    }

    #[tokio::test]
    async fn test_blank_query_is_a_no_op() {
        let (mut session, client) = session(vec![]).await;
        session.form_mut().query = "  ".to_string();

        assert!(session.run().await.unwrap().is_none());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_results_renders_notice() {
        let (mut session, client) = session(vec![]).await;
        session.form_mut().query = "animal control".to_string();

        let view = session.run().await.unwrap().unwrap();

        assert!(view.is_empty());
        assert!(view.to_markdown().contains(NO_RESULTS));
        assert!(!view.to_markdown().contains("References"));
        assert_eq!(client.requests()[0].limit, 5);
        assert_eq!(client.requests()[0].filter, FilterExpr::MatchAll);
    }

    #[tokio::test]
    async fn test_noise_ordinance_reference_row() {
        let (mut session, _) = session(vec![record("text...", "ch1.pdf", "http://x", "")]).await;
        session.form_mut().query = "noise ordinance".to_string();

        let view = session.run().await.unwrap().unwrap();

        assert!(view.references.contains("| ch1.pdf | [Link](http://x) |  |"));
        assert_eq!(view.cards[0].links.as_deref(), Some("[📄 View PDF](http://x)"));
    }

    #[tokio::test]
    async fn test_full_text_reveals_original_chunk() {
        let long = "Section 36.0401 prohibits amplified sound between ten at night and seven \
                    in the morning in residential zones, with exceptions for permitted events.";
        let (mut session, _) = session(vec![
            record("short one", "a.pdf", "", ""),
            record(long, "b.pdf", "", ""),
        ])
        .await;
        session.form_mut().set_context_length(100).unwrap();
        session.form_mut().query = "noise".to_string();

        let view = session.run().await.unwrap().unwrap();

        assert!(!view.cards[0].truncated);
        assert!(view.cards[1].truncated);
        assert_eq!(session.full_text(2), Some(long));
        assert_eq!(session.full_text(0), None);
        assert_eq!(session.full_text(3), None);
    }

    #[tokio::test]
    async fn test_filters_are_sent_and_unknown_columns_reported() {
        let (mut session, client) = session(vec![]).await;
        let form = session.form_mut();
        form.query = "parking".to_string();
        form.attributes.select("CHAPTER", "8");
        form.attributes.select("DISTRICT", "3");

        assert_eq!(session.unknown_filter_columns(), vec!["DISTRICT"]);
        session.run().await.unwrap();

        assert!(matches!(client.requests()[0].filter, FilterExpr::And(ref clauses) if clauses.len() == 2));
    }

    #[test]
    fn test_form_bounds() {
        let mut form = SearchForm::default();
        assert!(form.set_limit(0).is_err());
        assert!(form.set_context_length(300).is_err());
        assert!(form.set_context_length(1600).is_ok());
        assert_eq!(form.context_length(), 1600);
        assert_eq!(form.limit(), DEFAULT_LIMIT);
    }
}
