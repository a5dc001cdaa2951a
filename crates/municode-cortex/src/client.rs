//! Cortex REST client implementation

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use municode_core::{
    Error, GenerationClient, Model, Result, SearchClient, SearchRecord, SearchRequest,
    ServiceDescription,
};

use crate::config::CortexConfig;

/// Client for Cortex Search, Cortex Complete and the SQL statements API
pub struct CortexClient {
    config: CortexConfig,
    client: Client,
}

/// REST endpoint a request was sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Search,
    Statements,
    Complete,
}

impl Endpoint {
    fn label(&self) -> &'static str {
        match self {
            Endpoint::Search => "Cortex Search",
            Endpoint::Statements => "SQL statement",
            Endpoint::Complete => "Cortex Complete",
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<SearchRecord>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Serialize)]
struct StatementRequest<'a> {
    statement: String,
    timeout: u32,
    database: &'a str,
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    result_set_meta_data: ResultSetMetaData,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<RowType>,
}

#[derive(Deserialize)]
struct RowType {
    name: String,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    stream: bool,
}

impl CortexClient {
    /// Create a new Cortex client from configuration
    pub fn new(config: CortexConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("municode/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.config.token_type.header_value(),
            )
    }

    /// Send a request and return the body text of a successful response
    async fn send(&self, builder: RequestBuilder, endpoint: Endpoint) -> Result<String> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(Error::Network(e.to_string())),
            Err(_) => "Unknown error".to_string(),
        };

        match classify_response(status, endpoint, &body, &self.config.qualified_service_name()) {
            Some(error) => Err(error),
            None => Ok(body),
        }
    }
}

/// Map a response status to the error it stands for, `None` when usable
fn classify_response(status: StatusCode, endpoint: Endpoint, body: &str, service: &str) -> Option<Error> {
    // The statements API answers 202 when the statement outlives its timeout
    if status == StatusCode::ACCEPTED && endpoint == Endpoint::Statements {
        return Some(Error::Search(format!(
            "{} for {} is still running (202 Accepted); no service description was returned",
            endpoint.label(),
            service
        )));
    }
    if status.is_success() {
        return None;
    }

    let message = format!(
        "{} request failed with status {}: {}",
        endpoint.label(),
        status,
        body
    );

    Some(match (status, endpoint) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Error::Authentication(message),
        (StatusCode::NOT_FOUND, Endpoint::Search) => Error::ServiceNotFound(service.to_string()),
        (_, Endpoint::Complete) => Error::Generation(message),
        _ => Error::Search(message),
    })
}

/// Decode a Cortex Search query response
pub(crate) fn parse_query_response(body: &str) -> Result<Vec<SearchRecord>> {
    let response: QueryResponse = serde_json::from_str(body)?;
    if let Some(request_id) = &response.request_id {
        debug!(request_id = %request_id, "cortex search response");
    }
    Ok(response.results)
}

/// Decode the result of `DESC CORTEX SEARCH SERVICE`
pub(crate) fn parse_description(body: &str, service: &str) -> Result<ServiceDescription> {
    let response: StatementResponse = serde_json::from_str(body)?;

    let row = response
        .data
        .first()
        .ok_or_else(|| Error::ServiceNotFound(service.to_string()))?;

    let meta = &response.result_set_meta_data;
    Ok(ServiceDescription::from_metadata(
        column_value(meta, row, "attribute_columns")?,
        column_value(meta, row, "search_column")?,
        column_value(meta, row, "columns")?,
    ))
}

fn column_value<'a>(meta: &ResultSetMetaData, row: &'a [Option<String>], name: &str) -> Result<&'a str> {
    let index = meta
        .row_type
        .iter()
        .position(|r| r.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            Error::Serialization(format!("service description has no '{}' column", name))
        })?;
    Ok(row.get(index).and_then(|v| v.as_deref()).unwrap_or(""))
}

/// Extract the generated text from a Cortex Complete response
///
/// Accepts both the single JSON document returned for `stream: false` and
/// the Server-Sent Events framing the endpoint falls back to.
pub(crate) fn parse_completion(body: &str) -> Result<String> {
    let trimmed = body.trim_start();

    let answer = if trimmed.starts_with("data:") || trimmed.starts_with("event:") {
        let mut answer = String::new();
        for line in trimmed.lines() {
            let Some(json_data) = line.strip_prefix("data:") else {
                continue;
            };
            let json_data = json_data.trim();
            if json_data.is_empty() || json_data == "[DONE]" {
                continue;
            }

            let event: Value = serde_json::from_str(json_data)?;
            if let Some(text) = choice_text(&event, "delta") {
                answer.push_str(text);
            }
        }
        answer
    } else {
        let document: Value = serde_json::from_str(trimmed)?;
        choice_text(&document, "message").unwrap_or_default().to_string()
    };

    if answer.trim().is_empty() {
        return Err(Error::Generation(format!(
            "Empty response from Cortex Complete. Raw response: {}",
            body
        )));
    }

    Ok(answer)
}

fn choice_text<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    let choice = value.get("choices")?.get(0)?;
    choice
        .get(field)
        .and_then(|m| m.get("content"))
        .or_else(|| choice.get("text"))
        .and_then(Value::as_str)
}

#[async_trait]
impl SearchClient for CortexClient {
    async fn describe(&self) -> Result<ServiceDescription> {
        let service = self.config.qualified_service_name();
        let request = StatementRequest {
            statement: format!("DESC CORTEX SEARCH SERVICE {}", service),
            timeout: 60,
            database: &self.config.database,
            schema: &self.config.schema,
            warehouse: self.config.warehouse.as_deref(),
        };

        debug!(service = %service, "describing search service");
        let url = self.config.statements_url()?;
        let body = self
            .send(self.client.post(url).json(&request), Endpoint::Statements)
            .await?;

        parse_description(&body, &service)
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchRecord>> {
        debug!(
            query = %request.query,
            limit = request.limit,
            filter = %serde_json::to_string(&request.filter)?,
            "querying cortex search"
        );
        let url = self.config.search_url()?;
        let text = self
            .send(self.client.post(url).json(request), Endpoint::Search)
            .await?;

        let records = parse_query_response(&text)?;
        info!(records = records.len(), "cortex search returned");
        Ok(records)
    }

    fn service_name(&self) -> String {
        self.config.qualified_service_name()
    }
}

#[async_trait]
impl GenerationClient for CortexClient {
    async fn complete(&self, model: Model, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: model.as_str(),
            messages: vec![CompletionMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        debug!(model = %model, prompt_chars = prompt.chars().count(), "calling cortex complete");
        let url = self.config.complete_url()?;
        let body = self
            .send(self.client.post(url).json(&request), Endpoint::Complete)
            .await?;

        let answer = parse_completion(&body)?;
        info!(model = %model, answer_chars = answer.chars().count(), "cortex complete returned");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_keeps_backend_order() {
        let records = parse_query_response(
            r#"{"results": [
                {"CHUNK": "second ranked?", "RELATIVE_PATH": "b.pdf"},
                {"CHUNK": "first ranked?", "RELATIVE_PATH": "a.pdf", "CHAPTER_URL": null}
            ], "request_id": "abc"}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].relative_path, "b.pdf");
        assert_eq!(records[1].chapter_url, "");
    }

    #[test]
    fn test_description_from_statement_result() {
        let body = r#"{
            "resultSetMetaData": {"rowType": [
                {"name": "name"}, {"name": "search_column"},
                {"name": "attribute_columns"}, {"name": "columns"}
            ]},
            "data": [["MUNI_CODE_SEARCH", "CHUNK", "CHAPTER,TITLE", "CHUNK,RELATIVE_PATH,PDF_URL,CHAPTER_URL,CHAPTER,TITLE"]]
        }"#;

        let desc = parse_description(body, "SANDIEGO_AI.MUNI_CODE.MUNI_CODE_SEARCH").unwrap();
        assert_eq!(desc.search_column, "CHUNK");
        assert_eq!(desc.attribute_columns, vec!["CHAPTER", "TITLE"]);
        assert_eq!(desc.columns.len(), 6);
    }

    #[test]
    fn test_description_without_rows_is_not_found() {
        let body = r#"{"resultSetMetaData": {"rowType": [{"name": "columns"}]}, "data": []}"#;
        let err = parse_description(body, "DB.S.MISSING").unwrap_err();
        assert!(matches!(err, Error::ServiceNotFound(name) if name == "DB.S.MISSING"));
    }

    #[test]
    fn test_completion_document() {
        let answer = parse_completion(
            r#"{"choices": [{"message": {"content": "Leashes are required."}}], "usage": {}}"#,
        )
        .unwrap();
        assert_eq!(answer, "Leashes are required.");
    }

    #[test]
    fn test_completion_event_stream() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Fines are \"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"$250.\"}}]}\n\n\
                    data: [DONE]\n";
        assert_eq!(parse_completion(body).unwrap(), "Fines are $250.");
    }

    #[test]
    fn test_failure_statuses_map_to_error_kinds() {
        const SERVICE: &str = "SANDIEGO_AI.MUNI_CODE.MUNI_CODE_SEARCH";
        let classify = |status: u16, endpoint| {
            let status = StatusCode::from_u16(status).unwrap();
            classify_response(status, endpoint, "backend said no", SERVICE)
        };

        for endpoint in [Endpoint::Search, Endpoint::Statements, Endpoint::Complete] {
            assert!(classify(200, endpoint).is_none());
            assert!(matches!(classify(401, endpoint), Some(Error::Authentication(_))));
            assert!(matches!(classify(403, endpoint), Some(Error::Authentication(_))));
        }

        assert!(matches!(
            classify(404, Endpoint::Search),
            Some(Error::ServiceNotFound(name)) if name == SERVICE
        ));
        assert!(matches!(classify(404, Endpoint::Statements), Some(Error::Search(_))));
        assert!(matches!(classify(404, Endpoint::Complete), Some(Error::Generation(_))));
        assert!(matches!(classify(500, Endpoint::Complete), Some(Error::Generation(_))));
        assert!(classify(202, Endpoint::Search).is_none());
        assert!(classify(202, Endpoint::Complete).is_none());
    }

    #[test]
    fn test_failure_message_carries_status_and_body() {
        let err = classify_response(
            StatusCode::BAD_REQUEST,
            Endpoint::Search,
            "invalid filter: @eq expects an object",
            "DB.S.SVC",
        )
        .unwrap();

        let Error::Search(message) = err else {
            panic!("expected a search error, got {:?}", err);
        };
        assert!(message.contains("400 Bad Request"));
        assert!(message.contains("invalid filter: @eq expects an object"));
    }

    #[test]
    fn test_accepted_statement_is_reported_as_search_error() {
        let err = classify_response(StatusCode::ACCEPTED, Endpoint::Statements, "{}", "DB.S.SVC").unwrap();
        let Error::Search(message) = err else {
            panic!("expected a search error, got {:?}", err);
        };
        assert!(message.contains("202 Accepted"));
        assert!(message.contains("DB.S.SVC"));
    }

    #[test]
    fn test_search_body_is_the_request_itself() {
        let request = SearchRequest::new("noise ordinance", 3).unwrap();
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "query": "noise ordinance",
                "columns": ["CHUNK", "RELATIVE_PATH", "PDF_URL", "CHAPTER_URL"],
                "filter": {},
                "limit": 3
            })
        );
    }

    #[test]
    fn test_empty_completion_is_an_error() {
        let err = parse_completion(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
