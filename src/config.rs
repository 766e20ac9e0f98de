use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::db::policy::StatementPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Database used when nothing has been uploaded.
    pub fallback_path: String,
    /// Where uploaded database files are written.
    pub upload_dir: String,
    /// File extension accepted by the upload control, without the dot.
    pub allowed_extension: String,
    pub statement_policy: StatementPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "gemini", "remote", or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database file used when nothing has been uploaded
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<String>,

    /// Directory uploaded database files are written to
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Refuse statements that would modify the database
    #[arg(long)]
    pub read_only: bool,
}

const ENV_PREFIX: &str = "QUERYCRAFT";

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let mut config_builder = Config::builder()
            .set_default("web.host", defaults.web.host)?
            .set_default("web.port", i64::from(defaults.web.port))?
            .set_default("llm.backend", defaults.llm.backend)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default("database.fallback_path", defaults.database.fallback_path)?
            .set_default("database.upload_dir", defaults.database.upload_dir)?
            .set_default("database.allowed_extension", defaults.database.allowed_extension)?
            .set_default("database.statement_policy", "unrestricted")?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?;

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = [
                "querycraft.toml",
                "config/querycraft.toml",
                "/etc/querycraft/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // QUERYCRAFT__LLM__API_KEY and friends; this is where the credential lives
        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;
        config.apply_args(args);

        Ok(config)
    }

    fn apply_args(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.web.host = host.clone();
        }
        if let Some(port) = args.port {
            self.web.port = port;
        }
        if let Some(database) = &args.database {
            self.database.fallback_path = database.clone();
        }
        if let Some(upload_dir) = &args.upload_dir {
            self.database.upload_dir = upload_dir.clone();
        }
        if args.read_only {
            self.database.statement_policy = StatementPolicy::ReadOnly;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                fallback_path: "data.db".to_string(),
                upload_dir: ".".to_string(),
                allowed_extension: "db".to_string(),
                statement_policy: StatementPolicy::Unrestricted,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8501,
            },
            llm: LlmConfig {
                backend: "gemini".to_string(),
                model: "gemini-pro".to_string(),
                api_key: None,
                api_url: None,
                timeout_secs: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}
