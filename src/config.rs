use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub gmail: GmailConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where invitations come from and how they get accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Scan Gmail for GitHub invitation emails, accept through the web UI.
    Gmail,
    /// List pending invitations through the REST API, accept by ID.
    Invitations,
    /// Scan GitHub notifications, accept through the web UI.
    Notifications,
    /// Clone a single configured public repository. Nothing to accept.
    Public,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Gmail => "gmail",
            Mode::Invitations => "invitations",
            Mode::Notifications => "notifications",
            Mode::Public => "public",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Accepted for compatibility with older deployments. Nothing polls.
    pub check_interval_secs: Option<u64>,
    /// Accepted for compatibility with older deployments. Nothing retries.
    pub max_retries: Option<u32>,
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_github_web_base")]
    pub web_base: String,
    /// Personal access token for the REST API and private clones.
    pub token: Option<String>,
    /// Account used for the browser login.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Repository cloned in `public` mode.
    pub public_repo_url: Option<String>,
}

// Manual Debug impl to avoid leaking the token and password
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("public_repo_url", &self.public_repo_url)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct GmailConfig {
    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,
    /// Takes precedence over `token_file` when set.
    pub access_token: Option<String>,
    #[serde(default = "default_gmail_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_gmail_query")]
    pub query: String,
}

// Manual Debug impl to avoid leaking the access token
impl std::fmt::Debug for GmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailConfig")
            .field("api_base", &self.api_base)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .field("query", &self.query)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,
    #[serde(default = "default_git_program")]
    pub git_program: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Anthropic,
}

#[derive(Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,
    #[serde(default = "default_llm_provider")]
    pub provider: LlmProvider,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_report_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

fn default_mode() -> Mode {
    Mode::Invitations
}

fn default_max_items() -> usize {
    10
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_web_base() -> String {
    "https://github.com".to_string()
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_gmail_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_gmail_query() -> String {
    "from:noreply@github.com OR from:notifications@github.com".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_millis() -> u64 {
    500
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("./cloned_repos")
}

fn default_clone_timeout_secs() -> u64 {
    300
}

fn default_git_program() -> PathBuf {
    PathBuf::from("git")
}

fn default_llm_enabled() -> bool {
    true
}

fn default_llm_provider() -> LlmProvider {
    LlmProvider::Ollama
}

fn default_llm_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_max_tokens() -> u32 {
    512
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_items: default_max_items(),
            check_interval_secs: None,
            max_retries: None,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            web_base: default_github_web_base(),
            token: None,
            username: None,
            password: None,
            public_repo_url: None,
        }
    }
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: default_gmail_api_base(),
            access_token: None,
            token_file: default_gmail_token_file(),
            query: default_gmail_query(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: default_workspace_dir(),
            clone_timeout_secs: default_clone_timeout_secs(),
            git_program: default_git_program(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            api_key: None,
            temperature: 0.0,
            max_tokens: default_llm_max_tokens(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("courier").required(false));
        }

        // Environment variable overrides with COURIER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("COURIER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Check that everything the selected mode needs is present.
    ///
    /// Runs before any stage; a failure here means no report is written.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_items == 0 {
            return Err(AppError::Config("pipeline.max_items must be at least 1".to_string()));
        }
        if self.workspace.clone_timeout_secs == 0 {
            return Err(AppError::Config(
                "workspace.clone_timeout_secs must be at least 1".to_string(),
            ));
        }

        match self.pipeline.mode {
            Mode::Gmail => {
                self.require_browser_login()?;
                if self.gmail.access_token.is_none() && !self.gmail.token_file.exists() {
                    return Err(AppError::Config(format!(
                        "Gmail token not found: set gmail.access_token or provide {}",
                        self.gmail.token_file.display()
                    )));
                }
            }
            Mode::Invitations => {
                self.require_github_token()?;
            }
            Mode::Notifications => {
                self.require_github_token()?;
                self.require_browser_login()?;
            }
            Mode::Public => {
                let url = self.github.public_repo_url.as_deref().unwrap_or("").trim();
                if url.is_empty() {
                    return Err(AppError::Config(
                        "github.public_repo_url is required in public mode".to_string(),
                    ));
                }
                if crate::accept::guard::is_template_repo_url(url) {
                    return Err(AppError::Config(format!(
                        "github.public_repo_url is still the placeholder {url}"
                    )));
                }
            }
        }

        Ok(())
    }

    fn require_github_token(&self) -> Result<()> {
        match self.github.token.as_deref() {
            Some(t) if !t.is_empty() => Ok(()),
            _ => Err(AppError::Config(format!(
                "github.token is required in {} mode",
                self.pipeline.mode
            ))),
        }
    }

    fn require_browser_login(&self) -> Result<()> {
        let has_user = self.github.username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.github.password.as_deref().is_some_and(|p| !p.is_empty());
        if !has_user || !has_password {
            return Err(AppError::Config(format!(
                "github.username and github.password are required in {} mode",
                self.pipeline.mode
            )));
        }
        Ok(())
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.request_timeout_secs)
    }
}

impl GmailConfig {
    /// Resolve the OAuth access token, reading the token file when no inline
    /// token is configured. Refreshing expired tokens is left to the tool
    /// that wrote the file.
    pub fn resolve_access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        read_token_file(&self.token_file)
    }
}

fn read_token_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read Gmail token file {}: {e}", path.display()))
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| AppError::Config(format!("Invalid Gmail token file {}: {e}", path.display())))?;

    value["token"]
        .as_str()
        .or_else(|| value["access_token"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            AppError::Config(format!(
                "Gmail token file {} has no token or access_token field",
                path.display()
            ))
        })
}
