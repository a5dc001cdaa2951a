//! Search client trait and request type

use async_trait::async_trait;
use serde::Serialize;

use crate::{DEFAULT_COLUMNS, Error, FilterExpr, Result, SearchRecord, ServiceDescription};

/// A single query against the search service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub columns: Vec<String>,
    pub filter: FilterExpr,
    pub limit: usize,
}

impl SearchRequest {
    /// Create a request projecting [`DEFAULT_COLUMNS`] with no filter
    ///
    /// A zero limit is rejected; it is the only check done locally.
    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidInput(
                "result limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            query: query.into(),
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            filter: FilterExpr::MatchAll,
            limit,
        })
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = filter;
        self
    }
}

/// Trait for hosted search services (e.g., Cortex Search)
///
/// Results come back in the order the service ranked them and are never
/// reordered or filtered locally.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch the service's column metadata
    async fn describe(&self) -> Result<ServiceDescription>;

    /// Run a query and return the ranked records
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchRecord>>;

    /// Fully qualified name of the service, for display
    fn service_name(&self) -> String;
}
