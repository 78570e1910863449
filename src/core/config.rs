use std::{env, fs, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:8501", "http://localhost:5173", "http://localhost:3000"];

const SUPPORTED_DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

const MENTOR_DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const MENTOR_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const COMPANION_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const COMPANION_DEFAULT_MODEL: &str = "gpt-4";

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    security: SecuritySettings,
    cors: CorsSettings,
    database: DatabaseSettings,
    question_bank: QuestionBankSettings,
    redis: RedisSettings,
    llm: LlmSettings,
    chat: ChatSettings,
    storage: StorageSettings,
    s3: S3Settings,
    session: SessionSettings,
    speech: SpeechSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    host: ServerHost,
    port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) api_v1_str: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SecuritySettings {
    pub(crate) secret_key: String,
    pub(crate) access_token_expire_minutes: u64,
    pub(crate) algorithm: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct DatabaseSettings {
    pub(crate) postgres_server: String,
    pub(crate) postgres_port: u16,
    pub(crate) postgres_user: String,
    pub(crate) postgres_password: String,
    pub(crate) postgres_db: String,
    pub(crate) database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionBankSettings {
    /// Separate read-only source; `None` reuses the main pool.
    pub(crate) url: Option<String>,
    pub(crate) sample_size: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct RedisSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) db: u16,
    pub(crate) password: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ProviderSettings {
    pub(crate) name: &'static str,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
}

#[derive(Debug, Clone)]
pub(crate) struct LlmSettings {
    pub(crate) mentor: ProviderSettings,
    pub(crate) companion: ProviderSettings,
    pub(crate) temperature: f64,
    pub(crate) max_tokens: u32,
    pub(crate) request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct ChatSettings {
    pub(crate) max_history_messages: usize,
    pub(crate) max_history_chars: usize,
    pub(crate) summary_input_chars: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct StorageSettings {
    pub(crate) max_upload_size_mb: u64,
    pub(crate) allowed_document_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct S3Settings {
    pub(crate) endpoint: String,
    pub(crate) access_key: String,
    pub(crate) secret_key: String,
    pub(crate) bucket: String,
    pub(crate) region: String,
}

#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) idle_timeout_minutes: u64,
    pub(crate) sweep_interval_seconds: u64,
    pub(crate) max_per_account: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct SpeechSettings {
    pub(crate) enabled: bool,
    pub(crate) model: String,
    pub(crate) voice: String,
    pub(crate) join_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("MEDMENTOR_HOST", "0.0.0.0");
        let port = env_or_default("MEDMENTOR_PORT", "8000");

        let environment = parse_environment(
            env_optional("MEDMENTOR_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("MEDMENTOR_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "MedMentor API");
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "medmentor");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "medmentor");
        let database_url = env_optional("DATABASE_URL");

        let question_bank_url = env_optional("QUESTION_BANK_URL");
        let question_sample_size = parse_u32(
            "QUESTION_BANK_SAMPLE_SIZE",
            env_or_default("QUESTION_BANK_SAMPLE_SIZE", "10"),
        )?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let mentor = ProviderSettings {
            name: "mentor",
            api_key: env_optional("MENTOR_API_KEY")
                .or_else(|| env_optional("GROQ_API_KEY"))
                .unwrap_or_default(),
            base_url: env_or_default("MENTOR_BASE_URL", MENTOR_DEFAULT_BASE_URL),
            model: env_or_default("MENTOR_MODEL", MENTOR_DEFAULT_MODEL),
        };
        let companion = ProviderSettings {
            name: "companion",
            api_key: env_optional("COMPANION_API_KEY")
                .or_else(|| env_optional("OPENAI_API_KEY"))
                .unwrap_or_default(),
            base_url: env_or_default("COMPANION_BASE_URL", COMPANION_DEFAULT_BASE_URL),
            model: env_or_default("COMPANION_MODEL", COMPANION_DEFAULT_MODEL),
        };
        let temperature =
            parse_f64("LLM_TEMPERATURE", env_or_default("LLM_TEMPERATURE", "0.5"))?;
        let max_tokens = parse_u32("LLM_MAX_TOKENS", env_or_default("LLM_MAX_TOKENS", "1024"))?;
        let request_timeout_seconds = parse_u64(
            "LLM_REQUEST_TIMEOUT",
            env_or_default("LLM_REQUEST_TIMEOUT", "120"),
        )?;

        let max_history_messages = parse_usize(
            "CHAT_MAX_HISTORY_MESSAGES",
            env_or_default("CHAT_MAX_HISTORY_MESSAGES", "20"),
        )?;
        let max_history_chars = parse_usize(
            "CHAT_MAX_HISTORY_CHARS",
            env_or_default("CHAT_MAX_HISTORY_CHARS", "12000"),
        )?;
        let summary_input_chars = parse_usize(
            "SUMMARY_INPUT_CHARS",
            env_or_default("SUMMARY_INPUT_CHARS", "5000"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_document_extensions = parse_string_list(
            env_optional("ALLOWED_DOCUMENT_EXTENSIONS"),
            SUPPORTED_DOCUMENT_EXTENSIONS,
        );

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://s3.amazonaws.com");
        let s3_access_key = env_optional("S3_ACCESS_KEY")
            .or_else(|| env_optional("AWS_ACCESS_KEY_ID"))
            .unwrap_or_default();
        let s3_secret_key = env_optional("S3_SECRET_KEY")
            .or_else(|| env_optional("AWS_SECRET_ACCESS_KEY"))
            .unwrap_or_default();
        let s3_bucket = env_optional("S3_BUCKET")
            .or_else(|| env_optional("S3_BUCKET_NAME"))
            .unwrap_or_else(|| "medmentor-documents".to_string());
        let s3_region = env_optional("S3_REGION")
            .or_else(|| env_optional("AWS_REGION"))
            .unwrap_or_else(|| "us-east-1".to_string());

        let idle_timeout_minutes = parse_u64(
            "SESSION_IDLE_TIMEOUT_MINUTES",
            env_or_default("SESSION_IDLE_TIMEOUT_MINUTES", "120"),
        )?;
        let sweep_interval_seconds = parse_u64(
            "SESSION_SWEEP_INTERVAL_SECONDS",
            env_or_default("SESSION_SWEEP_INTERVAL_SECONDS", "60"),
        )?;
        let max_sessions_per_account = parse_usize(
            "SESSION_MAX_PER_ACCOUNT",
            env_or_default("SESSION_MAX_PER_ACCOUNT", "20"),
        )?;

        let speech_enabled =
            env_optional("SPEECH_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);
        let speech_model = env_or_default("SPEECH_MODEL", "tts-1");
        let speech_voice = env_or_default("SPEECH_VOICE", "nova");
        let speech_join_timeout_ms = parse_u64(
            "SPEECH_JOIN_TIMEOUT_MS",
            env_or_default("SPEECH_JOIN_TIMEOUT_MS", "1000"),
        )?;

        let log_level = env_or_default("MEDMENTOR_LOG_LEVEL", "info");
        let json = env_optional("MEDMENTOR_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            question_bank: QuestionBankSettings {
                url: question_bank_url,
                sample_size: question_sample_size,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            llm: LlmSettings {
                mentor,
                companion,
                temperature,
                max_tokens,
                request_timeout_seconds,
            },
            chat: ChatSettings { max_history_messages, max_history_chars, summary_input_chars },
            storage: StorageSettings { max_upload_size_mb, allowed_document_extensions },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            session: SessionSettings {
                idle_timeout_minutes,
                sweep_interval_seconds,
                max_per_account: max_sessions_per_account,
            },
            speech: SpeechSettings {
                enabled: speech_enabled,
                model: speech_model,
                voice: speech_voice,
                join_timeout_ms: speech_join_timeout_ms,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn question_bank(&self) -> &QuestionBankSettings {
        &self.question_bank
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn llm(&self) -> &LlmSettings {
        &self.llm
    }

    pub(crate) fn chat(&self) -> &ChatSettings {
        &self.chat
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub(crate) fn speech(&self) -> &SpeechSettings {
        &self.speech
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_document_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_DOCUMENT_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }
        for extension in &self.storage.allowed_document_extensions {
            if !SUPPORTED_DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_DOCUMENT_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.question_bank.sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "QUESTION_BANK_SAMPLE_SIZE",
                value: String::from("0"),
            });
        }

        if self.session.max_per_account == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_MAX_PER_ACCOUNT",
                value: String::from("0"),
            });
        }

        if self.chat.max_history_messages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CHAT_MAX_HISTORY_MESSAGES",
                value: String::from("0"),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        if self.llm.mentor.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("MENTOR_API_KEY"));
        }

        if self.llm.companion.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("COMPANION_API_KEY"));
        }

        Ok(())
    }
}

impl DatabaseSettings {
    pub(crate) fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

impl RedisSettings {
    pub(crate) fn redis_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!("redis://:{}@{}:{}/{}", self.password, self.host, self.port, self.db)
        }
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_f64(field: &'static str, value: String) -> Result<f64, ConfigError> {
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}

fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let defaults = || DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect();

    let Some(raw) = value else {
        return Ok(defaults());
    };

    if raw.trim().is_empty() {
        return Ok(defaults());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(defaults());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(defaults());
    }

    Ok(items)
}

fn parse_string_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(raw) => raw
            .split(',')
            .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|item| !item.is_empty())
            .collect(),
        None => defaults.iter().map(|item| item.to_string()).collect(),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|val| val.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

fn load_or_create_secret_key() -> String {
    let path = secret_file_path();

    if let Ok(value) = fs::read_to_string(&path) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let new_key = generate_secret_key();

    match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
                    tracing::warn!(error = %err, path = %path.display(), "Failed to set secret key file permissions");
                }
            }
            if let Err(err) = std::io::Write::write_all(&mut file, new_key.as_bytes()) {
                tracing::warn!(error = %err, path = %path.display(), "Failed to write secret key file");
            }
            return new_key;
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            if let Ok(value) = fs::read_to_string(&path) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to create secret key file");
        }
    }

    new_key
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn secret_file_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key")
}
