use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use clap::Parser;
use std::fs;
use tracing::{info, warn};
use url::Url;

const DEFAULT_PUBLIC_BASE_URL: &str = "https://nakama.weforks.org";
const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_AIRTABLE_URL: &str = "https://api.airtable.com/v0";

/// Configuration for the Nakama server and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path or URL of the SQLite database
    pub database_url: String,
    /// Address the server binds to
    pub host: String,
    /// Port the server listens on
    pub port: u16,
    /// Secret used to sign session cookies
    pub session_secret: String,
    /// Public origin of the site, used for card URLs and the OAuth redirect
    pub public_base_url: String,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,

    /// Cards created (and cells filled) per pipeline step
    pub number_of_cards: usize,
    /// Placeholder images drawn per pipeline run
    pub images_per_run: usize,
    pub cards_folder: PathBuf,
    pub qr_codes_folder: PathBuf,
    pub coins_db_json: PathBuf,
    pub descriptions_csv: PathBuf,
    pub game_stats_csv: PathBuf,
    pub coingecko_url: String,

    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub airtable_table_id: Option<String>,
    pub airtable_view_name: Option<String>,
    pub airtable_url: String,

    /// Directory for the daily rolling log file; no file log when unset
    pub log_dir: Option<PathBuf>,
    /// Emit logs as JSON lines
    pub log_json: bool,
    pub debug: bool,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub session_secret: Option<String>,
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub google_client_secret: Option<String>,
    #[serde(default)]
    pub google_auth_url: Option<String>,
    #[serde(default)]
    pub google_token_url: Option<String>,
    #[serde(default)]
    pub google_userinfo_url: Option<String>,
    #[serde(default)]
    pub number_of_cards: Option<usize>,
    #[serde(default)]
    pub images_per_run: Option<usize>,
    #[serde(default)]
    pub cards_folder: Option<PathBuf>,
    #[serde(default)]
    pub qr_codes_folder: Option<PathBuf>,
    #[serde(default)]
    pub coins_db_json: Option<PathBuf>,
    #[serde(default)]
    pub descriptions_csv: Option<PathBuf>,
    #[serde(default)]
    pub game_stats_csv: Option<PathBuf>,
    #[serde(default)]
    pub coingecko_url: Option<String>,
    #[serde(default)]
    pub airtable_api_key: Option<String>,
    #[serde(default)]
    pub airtable_base_id: Option<String>,
    #[serde(default)]
    pub airtable_table_id: Option<String>,
    #[serde(default)]
    pub airtable_view_name: Option<String>,
    #[serde(default)]
    pub airtable_url: Option<String>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_json: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
}

/// Nakama collectible card service
///
/// These arguments are shared by the server and the CLI.
#[derive(Parser, Debug, Default)]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to bind the server to
    #[clap(long, env = "NAKAMA_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[clap(long, env = "PORT")]
    pub port: Option<u16>,

    /// Secret used to sign session cookies
    #[clap(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Public origin of the site
    #[clap(long, env = "APP_URL")]
    pub public_base_url: Option<String>,

    /// Google OAuth callback; its origin is the public origin unless one is given
    #[clap(long, env = "GOOGLE_CALLBACK_URL")]
    pub google_callback_url: Option<String>,

    #[clap(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    #[clap(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    #[clap(long, env = "GOOGLE_AUTH_URL")]
    pub google_auth_url: Option<String>,

    #[clap(long, env = "GOOGLE_TOKEN_URL")]
    pub google_token_url: Option<String>,

    #[clap(long, env = "GOOGLE_USERINFO_URL")]
    pub google_userinfo_url: Option<String>,

    /// Cards created per pipeline run
    #[clap(long, env = "NUMBER_OF_CARDS")]
    pub number_of_cards: Option<usize>,

    /// Placeholder images drawn per pipeline run
    #[clap(long, env = "IMAGES_PER_RUN")]
    pub images_per_run: Option<usize>,

    /// Folder holding the card images
    #[clap(long, env = "CARDS_BANK_FOLDER")]
    pub cards_folder: Option<PathBuf>,

    #[clap(long, env = "QR_CODES_FOLDER")]
    pub qr_codes_folder: Option<PathBuf>,

    /// Coin listing saved by the fetch step
    #[clap(long, env = "COINS_DB_JSON")]
    pub coins_db_json: Option<PathBuf>,

    #[clap(long, env = "DESCRIPTIONS_CSV")]
    pub descriptions_csv: Option<PathBuf>,

    #[clap(long, env = "GAME_STATS_CSV")]
    pub game_stats_csv: Option<PathBuf>,

    #[clap(long, env = "COINGECKO_URL")]
    pub coingecko_url: Option<String>,

    #[clap(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    pub airtable_api_key: Option<String>,

    #[clap(long, env = "AIRTABLE_BASE_ID")]
    pub airtable_base_id: Option<String>,

    #[clap(long, env = "AIRTABLE_TABLE_ID")]
    pub airtable_table_id: Option<String>,

    #[clap(long, env = "AIRTABLE_VIEW_NAME")]
    pub airtable_view_name: Option<String>,

    #[clap(long, env = "AIRTABLE_URL")]
    pub airtable_url: Option<String>,

    /// Directory for rolling log files
    #[clap(long, env = "NAKAMA_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[clap(long, env = "NAKAMA_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Debug mode
    #[clap(long, env = "NAKAMA_DEBUG", default_value_t = false)]
    pub debug: bool,
}

/// Airtable connection settings, present only when fully configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirtableSettings {
    pub api_url: String,
    pub api_key: String,
    pub base_id: String,
    pub table_id: String,
    pub view_name: Option<String>,
}

/// Google OAuth client settings, present only when fully configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            host: update.host.unwrap_or(self.host),
            port: update.port.unwrap_or(self.port),
            session_secret: update.session_secret.unwrap_or(self.session_secret),
            public_base_url: update.public_base_url.unwrap_or(self.public_base_url),
            google_client_id: update.google_client_id.or(self.google_client_id),
            google_client_secret: update.google_client_secret.or(self.google_client_secret),
            google_auth_url: update.google_auth_url.unwrap_or(self.google_auth_url),
            google_token_url: update.google_token_url.unwrap_or(self.google_token_url),
            google_userinfo_url: update.google_userinfo_url.unwrap_or(self.google_userinfo_url),
            number_of_cards: update.number_of_cards.unwrap_or(self.number_of_cards),
            images_per_run: update.images_per_run.unwrap_or(self.images_per_run),
            cards_folder: update.cards_folder.unwrap_or(self.cards_folder),
            qr_codes_folder: update.qr_codes_folder.unwrap_or(self.qr_codes_folder),
            coins_db_json: update.coins_db_json.unwrap_or(self.coins_db_json),
            descriptions_csv: update.descriptions_csv.unwrap_or(self.descriptions_csv),
            game_stats_csv: update.game_stats_csv.unwrap_or(self.game_stats_csv),
            coingecko_url: update.coingecko_url.unwrap_or(self.coingecko_url),
            airtable_api_key: update.airtable_api_key.or(self.airtable_api_key),
            airtable_base_id: update.airtable_base_id.or(self.airtable_base_id),
            airtable_table_id: update.airtable_table_id.or(self.airtable_table_id),
            airtable_view_name: update.airtable_view_name.or(self.airtable_view_name),
            airtable_url: update.airtable_url.unwrap_or(self.airtable_url),
            log_dir: update.log_dir.or(self.log_dir),
            log_json: update.log_json.unwrap_or(self.log_json),
            debug: update.debug.unwrap_or(self.debug),
        }
    }

    /// The Airtable settings when key, base and table are all set
    pub fn airtable(&self) -> Option<AirtableSettings> {
        Some(AirtableSettings {
            api_url: self.airtable_url.trim_end_matches('/').to_string(),
            api_key: non_blank(&self.airtable_api_key)?,
            base_id: non_blank(&self.airtable_base_id)?,
            table_id: non_blank(&self.airtable_table_id)?,
            view_name: non_blank(&self.airtable_view_name),
        })
    }

    /// The Google OAuth settings when client id and secret are set
    pub fn google(&self) -> Option<GoogleSettings> {
        Some(GoogleSettings {
            client_id: non_blank(&self.google_client_id)?,
            client_secret: non_blank(&self.google_client_secret)?,
            auth_url: self.google_auth_url.clone(),
            token_url: self.google_token_url.clone(),
            userinfo_url: self.google_userinfo_url.clone(),
            redirect_uri: format!(
                "{}/auth/google/callback",
                self.public_base_url.trim_end_matches('/')
            ),
        })
    }

    /// Logs the effective configuration without secrets
    pub fn log_summary(&self) {
        info!(
            "Final configuration: database_url={}, bind={}, public_base_url={}, cards_folder={}, coins_db_json={}, airtable={}, google={}",
            self.database_url,
            self.bind_address(),
            self.public_base_url,
            self.cards_folder.display(),
            self.coins_db_json.display(),
            self.airtable().is_some(),
            self.google().is_some()
        );
    }

    /// The `host:port` the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {
    let database_url = config_path.map_or("nakama.db".to_string(), |path| {
        path.join("nakama.db").to_string_lossy().to_string()
    });

    Config {
        database_url,
        host: "0.0.0.0".to_string(),
        port: 5000,
        session_secret: String::new(),
        public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        google_client_id: None,
        google_client_secret: None,
        google_auth_url: DEFAULT_GOOGLE_AUTH_URL.to_string(),
        google_token_url: DEFAULT_GOOGLE_TOKEN_URL.to_string(),
        google_userinfo_url: DEFAULT_GOOGLE_USERINFO_URL.to_string(),
        number_of_cards: 5,
        images_per_run: 5,
        cards_folder: PathBuf::from("static/cards"),
        qr_codes_folder: PathBuf::from("static/qr_codes"),
        coins_db_json: PathBuf::from("data/coins_db.json"),
        descriptions_csv: PathBuf::from("data/card_descriptions.csv"),
        game_stats_csv: PathBuf::from("data/game_stats.csv"),
        coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
        airtable_api_key: None,
        airtable_base_id: None,
        airtable_table_id: None,
        airtable_view_name: None,
        airtable_url: DEFAULT_AIRTABLE_URL.to_string(),
        log_dir: None,
        log_json: false,
        debug: false,
    }
}

/// Loads configuration from a TOML file
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate, String> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    match fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<ConfigUpdate>(&content) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                Ok(config)
            },
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                Err(format!("Failed to parse config file: {}", e))
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            Err(format!("Failed to read config file: {}", e))
        }
    }
}

/// `scheme://host[:port]` of a callback URL
fn callback_origin(callback_url: &str) -> Option<String> {
    match Url::parse(callback_url.trim()) {
        Ok(url) if url.has_host() => Some(url.origin().ascii_serialization()),
        Ok(_) => None,
        Err(e) => {
            warn!("Ignoring GOOGLE_CALLBACK_URL {:?}: {}", callback_url, e);
            None
        }
    }
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: CliArgs) -> ConfigUpdate {
    let public_base_url = args
        .public_base_url
        .or_else(|| args.google_callback_url.as_deref().and_then(callback_origin));

    ConfigUpdate {
        database_url: args.database_url,
        host: args.host,
        port: args.port,
        session_secret: args.session_secret,
        public_base_url,
        google_client_id: args.google_client_id,
        google_client_secret: args.google_client_secret,
        google_auth_url: args.google_auth_url,
        google_token_url: args.google_token_url,
        google_userinfo_url: args.google_userinfo_url,
        number_of_cards: args.number_of_cards,
        images_per_run: args.images_per_run,
        cards_folder: args.cards_folder,
        qr_codes_folder: args.qr_codes_folder,
        coins_db_json: args.coins_db_json,
        descriptions_csv: args.descriptions_csv,
        game_stats_csv: args.game_stats_csv,
        coingecko_url: args.coingecko_url,
        airtable_api_key: args.airtable_api_key,
        airtable_base_id: args.airtable_base_id,
        airtable_table_id: args.airtable_table_id,
        airtable_view_name: args.airtable_view_name,
        airtable_url: args.airtable_url,
        log_dir: args.log_dir,
        // Flags only override when set
        log_json: args.log_json.then_some(true),
        debug: args.debug.then_some(true),
    }
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: CliArgs) -> Config {
    let config_path = match ProjectDirs::from("org", "weforks", "nakama") {
        Some(proj_dirs) => Some(PathBuf::from(proj_dirs.config_dir())),
        None => {
            warn!("Could not determine XDG config directory, skipping config file");
            None
        }
    };

    let config_path = config_path.and_then(|path| {
        if !path.exists() {
            info!("Config path not found at {:?}, using defaults", path);
            None
        } else {
            Some(path)
        }
    });

    let base = base_config(config_path.clone());

    let file_update = config_from_file(config_path.map(|p| p.join("config.toml")))
        .unwrap_or_default();

    base.apply_update(file_update)
        .apply_update(config_from_args(args))
}
