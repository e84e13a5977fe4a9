//! Configuration types for PDF-to-JSON extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Both collaborators (the Textract OCR
//! call and the LLM call) read their settings from this one struct; nothing
//! in the library reads credentials or regions from the process environment
//! on its own.

use crate::error::Pdf2JsonError;
use crate::pipeline::llm::TextGenerator;
use crate::pipeline::ocr::DocumentAnalyzer;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Static AWS credentials for the Textract client.
///
/// When absent, the default AWS credential chain is used (environment,
/// shared profile, IMDS, …).
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for a PDF-to-JSON extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2json::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .region("eu-west-1")
///     .model("gpt-4.1-mini")
///     .strict_tables(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// AWS region for Textract, e.g. "us-east-1". If None, the AWS default
    /// region chain decides.
    pub region: Option<String>,

    /// Static credentials for Textract. If None, the AWS default chain is used.
    pub credentials: Option<AwsCredentials>,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses `gpt-4.1-nano`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed text generator. Takes precedence over `provider`.
    pub generator: Option<Arc<dyn TextGenerator>>,

    /// Pre-constructed document analyzer. If None, a Textract client is built
    /// from `region`, `credentials` and `ocr_timeout_secs`.
    pub analyzer: Option<Arc<dyn DocumentAnalyzer>>,

    /// Sampling temperature for the LLM completion. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 4096.
    pub max_tokens: usize,

    /// Fail with `NoTableFound` when OCR finds no table. Default: true.
    ///
    /// When false, a table-less document yields zero rows and the LLM is
    /// still asked to produce a (necessarily empty) document.
    pub strict_tables: bool,

    /// Custom system prompt. If None, uses built-in default.
    pub system_prompt: Option<String>,

    /// Reject local inputs that do not start with `%PDF`. Default: true.
    ///
    /// Textract also accepts PNG, JPEG and TIFF; turn this off to send those.
    pub require_pdf_magic: bool,

    /// Textract operation timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// LLM call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional stage-progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            region: None,
            credentials: None,
            model: None,
            provider_name: None,
            provider: None,
            generator: None,
            analyzer: None,
            temperature: 0.0,
            max_tokens: 4096,
            strict_tables: true,
            system_prompt: None,
            require_pdf_magic: true,
            ocr_timeout_secs: 120,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("generator", &self.generator.as_ref().map(|_| "<dyn TextGenerator>"))
            .field("analyzer", &self.analyzer.as_ref().map(|_| "<dyn DocumentAnalyzer>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("strict_tables", &self.strict_tables)
            .field("require_pdf_magic", &self.require_pdf_magic)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model id sent to the provider.
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    pub fn credentials(mut self, credentials: AwsCredentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        self.config.analyzer = Some(analyzer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn strict_tables(mut self, v: bool) -> Self {
        self.config.strict_tables = v;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn require_pdf_magic(mut self, v: bool) -> Self {
        self.config.require_pdf_magic = v;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2JsonError> {
        let c = &self.config;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(Pdf2JsonError::InvalidConfig(format!(
                "Temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(Pdf2JsonError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        for (name, secs) in [
            ("ocr_timeout_secs", c.ocr_timeout_secs),
            ("api_timeout_secs", c.api_timeout_secs),
            ("download_timeout_secs", c.download_timeout_secs),
        ] {
            if secs == 0 {
                return Err(Pdf2JsonError::InvalidConfig(format!("{name} must be ≥ 1")));
            }
        }
        if c.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(Pdf2JsonError::InvalidConfig("region must not be empty".into()));
        }
        Ok(self.config)
    }
}
