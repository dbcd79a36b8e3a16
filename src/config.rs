//! TOML configuration.
//!
//! The whole process reads one [`Config`], validated once by
//! [`load_config`] and then passed by reference into the ingestion
//! pipeline and the retrieval chain. Nothing reads configuration from
//! ambient state after startup.
//!
//! ```toml
//! [index]
//! name = "leekoko-index01"
//! namespace = "leekoko-pdf"
//! provider = "sqlite"
//! path = "./data/index.sqlite"
//!
//! [paths]
//! docs_dir = "./docs"
//! processed_dir = "./processed"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-ada-002"
//! dims = 1536
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{RagError, Result};

/// Environment variable consulted when `index.name` is not set in the file.
pub const INDEX_NAME_ENV: &str = "PINECONE_INDEX_NAME";
/// Environment variable consulted when `index.namespace` is not set in the file.
pub const NAMESPACE_ENV: &str = "PINECONE_NAME_SPACE";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_index_provider")]
    pub provider: String,
    /// SQLite file for the `sqlite` provider.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Index host URL for the `pinecone` provider.
    #[serde(default)]
    pub host: Option<String>,
}

fn default_index_provider() -> String {
    "sqlite".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            processed_dir: default_processed_dir(),
        }
    }
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_processed_dir() -> PathBuf {
    PathBuf::from("processed")
}

#[derive(Debug, Deserialize, Clone)]
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

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible proxies, remote Ollama).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: Some("text-embedding-ada-002".to_string()),
            dims: Some(1536),
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "openai".to_string()
}
fn default_generation_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Read, resolve and validate the configuration file.
///
/// Index name and namespace fall back to [`INDEX_NAME_ENV`] and
/// [`NAMESPACE_ENV`] when the file leaves them empty.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        RagError::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parse configuration text, resolving missing index settings through `env`.
pub fn parse_config(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config: Config = toml::from_str(content)
        .map_err(|e| RagError::Configuration(format!("failed to parse config file: {}", e)))?;

    if config.index.name.trim().is_empty() {
        config.index.name = env(INDEX_NAME_ENV).unwrap_or_default();
    }
    if config.index.namespace.trim().is_empty() {
        config.index.namespace = env(NAMESPACE_ENV).unwrap_or_default();
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let bail = |msg: String| Err(RagError::Configuration(msg));

    if config.index.name.trim().is_empty() {
        return bail(format!(
            "index.name is not set (config file or {})",
            INDEX_NAME_ENV
        ));
    }
    if config.index.namespace.trim().is_empty() {
        return bail(format!(
            "index.namespace is not set (config file or {})",
            NAMESPACE_ENV
        ));
    }

    match config.index.provider.as_str() {
        "sqlite" => {}
        "pinecone" => {
            if config.index.host.as_deref().unwrap_or("").is_empty() {
                return bail("index.host must be set when provider is 'pinecone'".to_string());
            }
        }
        other => {
            return bail(format!(
                "unknown index provider: '{}'. Must be sqlite or pinecone.",
                other
            ))
        }
    }

    if config.chunking.chunk_size == 0 {
        return bail("chunking.chunk_size must be > 0".to_string());
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return bail(format!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap, config.chunking.chunk_size
        ));
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => {
            return bail(format!(
                "unknown embedding provider: '{}'. Must be openai or ollama.",
                other
            ))
        }
    }
    if config.embedding.model.is_none() {
        return bail("embedding.model must be specified".to_string());
    }
    if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
        return bail("embedding.dims must be > 0".to_string());
    }
    if config.embedding.batch_size == 0 {
        return bail("embedding.batch_size must be > 0".to_string());
    }

    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => {
            return bail(format!(
                "unknown generation provider: '{}'. Must be openai or ollama.",
                other
            ))
        }
    }

    if config.retrieval.top_k == 0 {
        return bail("retrieval.top_k must be >= 1".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse_config(
            r#"
            [index]
            name = "idx"
            namespace = "pdf"
            "#,
            no_env,
        )
        .unwrap();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.chunk_overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 4);
        assert_eq!(cfg.generation.model, "gpt-3.5-turbo");
        assert_eq!(cfg.index.provider, "sqlite");
        assert_eq!(cfg.paths.docs_dir, PathBuf::from("docs"));
        assert_eq!(cfg.paths.processed_dir, PathBuf::from("processed"));
    }

    #[test]
    fn example_config_is_valid() {
        let cfg = parse_config(include_str!("../config/pdfqa.example.toml"), no_env).unwrap();
        assert_eq!(cfg.index.name, "leekoko-index01");
        assert_eq!(cfg.index.namespace, "leekoko-pdf");
        assert_eq!(cfg.embedding.dims, Some(1536));
    }

    #[test]
    fn missing_index_name_is_configuration_error() {
        let err = parse_config(
            r#"
            [index]
            namespace = "pdf"
            "#,
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Configuration(ref m) if m.contains("index.name")));
    }

    #[test]
    fn missing_namespace_is_configuration_error() {
        let err = parse_config("[index]\nname = \"idx\"\n", no_env).unwrap_err();
        assert!(matches!(err, RagError::Configuration(ref m) if m.contains("index.namespace")));
    }

    #[test]
    fn index_settings_fall_back_to_environment() {
        let env = |key: &str| match key {
            INDEX_NAME_ENV => Some("from-env".to_string()),
            NAMESPACE_ENV => Some("ns-env".to_string()),
            _ => None,
        };
        let cfg = parse_config("[index]\n", env).unwrap();
        assert_eq!(cfg.index.name, "from-env");
        assert_eq!(cfg.index.namespace, "ns-env");
    }

    #[test]
    fn file_values_win_over_environment() {
        let env = |_: &str| Some("from-env".to_string());
        let cfg = parse_config("[index]\nname = \"file\"\nnamespace = \"ns\"\n", env).unwrap();
        assert_eq!(cfg.index.name, "file");
        assert_eq!(cfg.index.namespace, "ns");
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = parse_config(
            r#"
            [index]
            name = "idx"
            namespace = "pdf"

            [chunking]
            chunk_size = 100
            chunk_overlap = 100
            "#,
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn pinecone_requires_host() {
        let err = parse_config(
            r#"
            [index]
            name = "idx"
            namespace = "pdf"
            provider = "pinecone"
            "#,
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Configuration(ref m) if m.contains("index.host")));
    }

    #[test]
    fn memory_index_is_not_configurable() {
        let err = parse_config(
            r#"
            [index]
            name = "idx"
            namespace = "pdf"
            provider = "memory"
            "#,
            no_env,
        )
        .unwrap_err();
        assert!(
            matches!(err, RagError::Configuration(ref m) if m.contains("unknown index provider: 'memory'"))
        );
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let err = parse_config(
            r#"
            [index]
            name = "idx"
            namespace = "pdf"

            [embedding]
            provider = "word2vec"
            model = "x"
            dims = 3
            "#,
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::Configuration(ref m) if m.contains("word2vec")));
    }
}
