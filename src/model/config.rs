use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "CLAIMS_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Built-in analysis prompt used when the config file defines no prompts.
/// `{context}` and `{claim_text}` placeholders are substituted at call time.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are an expert insurance claim adjuster. Your task is to analyze the following claim based on the provided policy documents.

POLICY DOCUMENTS:
{context}

CLAIM DETAILS:
{claim_text}

Analyze the claim and provide a JSON output with the following fields:
- recommendation: \"APPROVE\", \"REJECT\", or \"INVESTIGATE\"
- confidence: A score between 0.0 and 1.0
- reasoning: A detailed explanation of your decision citing specific parts of the policy.
- missing_info: List of any missing information if applicable.

Return ONLY valid JSON.";

/// Context retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum number of corpus documents returned by similarity search.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Results with cosine similarity below this never appear.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Approximate token budget for assembled context (1 token ~ 4 chars).
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

fn default_top_k() -> u32 {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_max_context_tokens() -> usize {
    8000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

/// Endpoints of the external capability providers
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Text extraction service base URL.
    #[serde(default = "default_extraction_url")]
    pub extraction_url: String,
    /// De-identification service base URL.
    #[serde(default = "default_deidentify_url")]
    pub deidentify_url: String,
    /// Language hint passed to the de-identification provider.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_extraction_url() -> String {
    "http://127.0.0.1:8002".to_string()
}

fn default_deidentify_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            extraction_url: default_extraction_url(),
            deidentify_url: default_deidentify_url(),
            language: default_language(),
        }
    }
}

/// A selectable analysis prompt template
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub template: String,
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptTemplate>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Size of the pipeline worker pool.
    pub workers: usize,
    /// Root directory for the filesystem blob store.
    pub blob_root: String,
    pub retrieval: RetrievalConfig,
    pub providers: ProviderConfig,
    pub prompts: BTreeMap<String, PromptTemplate>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 4,
            blob_root: "./blobs".to_string(),
            retrieval: RetrievalConfig::default(),
            providers: ProviderConfig::default(),
            prompts: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let workers = std::env::var("CLAIMS_WORKERS")
            .ok()
            .and_then(|w| w.parse().ok())
            .unwrap_or(4);

        let blob_root =
            std::env::var("CLAIMS_BLOB_ROOT").unwrap_or_else(|_| "./blobs".to_string());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            host,
            port,
            workers,
            blob_root,
            retrieval: file.retrieval,
            providers: file.providers,
            prompts: file.prompts,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    /// Look up a prompt template by id. The id `default` always resolves,
    /// falling back to the built-in template when the file defines none.
    pub fn prompt_template(&self, prompt_id: &str) -> Option<PromptTemplate> {
        if let Some(p) = self.prompts.get(prompt_id) {
            return Some(p.clone());
        }
        if prompt_id == "default" {
            return Some(PromptTemplate {
                name: "Standard analysis".to_string(),
                description: "Baseline claim analysis".to_string(),
                template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            });
        }
        None
    }

    /// Available prompt ids and display metadata, `default` always included.
    pub fn prompt_list(&self) -> Vec<(String, String, String)> {
        let mut list: Vec<(String, String, String)> = self
            .prompts
            .iter()
            .map(|(id, p)| (id.clone(), p.name.clone(), p.description.clone()))
            .collect();
        if !self.prompts.contains_key("default") {
            list.insert(
                0,
                (
                    "default".to_string(),
                    "Standard analysis".to_string(),
                    "Baseline claim analysis".to_string(),
                ),
            );
        }
        list
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
retrieval:
  top_k: 3
  similarity_threshold: 0.8
providers:
  deidentify_url: "http://deident:8001"
prompts:
  fraud:
    name: "Fraud screening"
    template: "Screen {claim_text} against {context}"
"#;
        let file: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.retrieval.top_k, 3);
        assert_eq!(file.retrieval.similarity_threshold, 0.8);
        // unset fields fall back to defaults
        assert_eq!(file.retrieval.max_context_tokens, 8000);
        assert_eq!(file.providers.deidentify_url, "http://deident:8001");
        assert_eq!(file.providers.language, "en");
        assert!(file.prompts.contains_key("fraud"));
    }

    #[test]
    fn test_default_prompt_always_available() {
        let config = Config::default();
        let prompt = config.prompt_template("default").unwrap();
        assert!(prompt.template.contains("{context}"));
        assert!(prompt.template.contains("{claim_text}"));
        assert!(config.prompt_template("no-such-prompt").is_none());
    }

    #[test]
    fn test_prompt_list_includes_default() {
        let config = Config::default();
        let list = config.prompt_list();
        assert_eq!(list[0].0, "default");
    }
}
