//! Scripted backends for pipeline tests

use async_trait::async_trait;
use std::sync::Mutex;

use municode_core::{
    Error, GenerationClient, Model, Result, SearchClient, SearchRecord, SearchRequest,
    ServiceDescription,
};

pub fn record(chunk: &str, path: &str, pdf: &str, chapter: &str) -> SearchRecord {
    SearchRecord {
        chunk: chunk.to_string(),
        relative_path: path.to_string(),
        pdf_url: pdf.to_string(),
        chapter_url: chapter.to_string(),
    }
}

/// Search backend returning a fixed record list and logging requests
pub struct ScriptedSearch {
    records: Vec<SearchRecord>,
    description: ServiceDescription,
    fail: bool,
    requests: Mutex<Vec<SearchRequest>>,
    describe_calls: Mutex<usize>,
}

impl ScriptedSearch {
    pub fn new(records: Vec<SearchRecord>) -> Self {
        Self {
            records,
            description: ServiceDescription::from_metadata(
                "CHAPTER",
                "CHUNK",
                "CHUNK,RELATIVE_PATH,PDF_URL,CHAPTER_URL,CHAPTER",
            ),
            fail: false,
            requests: Mutex::new(Vec::new()),
            describe_calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn describe_calls(&self) -> usize {
        *self.describe_calls.lock().unwrap()
    }
}

#[async_trait]
impl SearchClient for ScriptedSearch {
    async fn describe(&self) -> Result<ServiceDescription> {
        *self.describe_calls.lock().unwrap() += 1;
        Ok(self.description.clone())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchRecord>> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::ServiceNotFound("TEST.DB.MISSING".to_string()));
        }
        Ok(self.records.iter().take(request.limit).cloned().collect())
    }

    fn service_name(&self) -> String {
        "TEST_DB.TEST_SCHEMA.TEST_SERVICE".to_string()
    }
}

/// Generation backend replying with a fixed answer or error
pub struct ScriptedGeneration {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<(Model, String)>>,
}

impl ScriptedGeneration {
    pub fn answering(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(Model, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedGeneration {
    async fn complete(&self, model: Model, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((model, prompt.to_string()));
        self.reply.clone().map_err(Error::Generation)
    }
}
