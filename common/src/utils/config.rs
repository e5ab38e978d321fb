use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAI,
    Hashed,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_chat_models")]
    pub chat_models: Vec<String>,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Windowing policy applied at ingestion. Chunks are produced in document
/// order and consecutive chunks share `chunk_overlap` units of content.
#[derive(Clone, Copy, Deserialize, Debug, PartialEq, Eq)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Tunable parameters governing ranking, context selection, and answer
/// validation. The defaults are inherited heuristics, not proven-optimal
/// values.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct RetrievalConfig {
    /// Size of the coarse candidate pool kept after scoring.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Cap on the number of chunks supplied to the model as context.
    #[serde(default = "default_max_context")]
    pub max_context: usize,
    /// Best score below which a query is classified as unrelated to the
    /// document and refused without a model call.
    #[serde(default = "default_unrelated_threshold")]
    pub unrelated_threshold: f32,
    /// Absolute floor a candidate must clear to enter the context selection.
    #[serde(default = "default_score_floor")]
    pub score_floor: f32,
    /// Width of the similarity band below the top score that candidates may
    /// occupy and still be selected.
    #[serde(default = "default_band_margin")]
    pub band_margin: f32,
    /// Best score below which a generated answer is refused even when its
    /// citations check out.
    #[serde(default = "default_strict_threshold")]
    pub strict_threshold: f32,
    /// Phrases whose presence marks an answer as drawing on general
    /// knowledge rather than the supplied context. A blunt substring check;
    /// legitimate answers containing one of these are refused too, so treat
    /// the list as a policy knob.
    #[serde(default = "default_deny_phrases")]
    pub deny_phrases: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context: default_max_context(),
            unrelated_threshold: default_unrelated_threshold(),
            score_floor: default_score_floor(),
            band_margin: default_band_margin(),
            strict_threshold: default_strict_threshold(),
            deny_phrases: default_deny_phrases(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_chat_models() -> Vec<String> {
    ["llama3:8b", "mistral", "phi3"]
        .map(String::from)
        .to_vec()
}

const fn default_upload_max_body_bytes() -> usize {
    // Multipart framing overhead on top of the 25 MB per-file limit.
    26 * 1024 * 1024
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_chunk_overlap() -> usize {
    100
}

const fn default_top_k() -> usize {
    12
}

const fn default_max_context() -> usize {
    8
}

const fn default_unrelated_threshold() -> f32 {
    0.18
}

const fn default_score_floor() -> f32 {
    0.15
}

const fn default_band_margin() -> f32 {
    0.10
}

const fn default_strict_threshold() -> f32 {
    0.20
}

fn default_deny_phrases() -> Vec<String> {
    [
        "it is well known",
        "studies show",
        "the capital of",
        "common knowledge",
        "as an ai",
        "as a language model",
    ]
    .map(String::from)
    .to_vec()
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: "test-key".into(),
            openai_base_url: default_base_url(),
            surrealdb_address: "mem://".into(),
            surrealdb_username: "root".into(),
            surrealdb_password: "root".into(),
            surrealdb_namespace: "test_ns".into(),
            surrealdb_database: "test_db".into(),
            http_port: 0,
            upload_max_body_bytes: default_upload_max_body_bytes(),
            embedding_backend: EmbeddingBackend::Hashed,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            chat_models: default_chat_models(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}
