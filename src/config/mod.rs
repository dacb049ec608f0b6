//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use encoding_rs::Encoding;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::locale::Locale;

mod cli;

pub use cli::{CandidatesArgs, CliArgs, Command, ServeArgs, ServeOverrides, ViewOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vista";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RESOURCE_DIR: &str = "site";
const DEFAULT_CHARACTER_ENCODING: &str = "UTF-8";
const DEFAULT_VIEW_PREFIXES: [&str; 2] = ["WEB-INF", ""];
const DEFAULT_VIEW_SUFFIXES: [&str; 1] = [".html"];

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub views: ViewSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub resource_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Per-render view configuration. Each render context works on its own copy.
#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Text shown for null values.
    pub null_string: String,
    /// Path prefixes tried in order for every type level; `""` means the root.
    pub view_prefixes: Vec<String>,
    /// Path suffixes tried in order under each prefix.
    pub view_suffixes: Vec<String>,
    /// Charset for decoding captured byte output when the response declares none.
    pub default_character_encoding: String,
    /// Locale used when the request does not name a supported one.
    pub default_locale: Locale,
    pub time_zone: Tz,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            null_string: String::new(),
            view_prefixes: DEFAULT_VIEW_PREFIXES.map(String::from).to_vec(),
            view_suffixes: DEFAULT_VIEW_SUFFIXES.map(String::from).to_vec(),
            default_character_encoding: DEFAULT_CHARACTER_ENCODING.to_string(),
            default_locale: Locale::default(),
            time_zone: Tz::UTC,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VISTA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Candidates(args)) => raw.apply_view_overrides(&args.views),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    views: RawViewSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(dir) = overrides.resource_dir.as_ref() {
            self.server.resource_dir = Some(dir.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_view_overrides(&overrides.views);
    }

    fn apply_view_overrides(&mut self, overrides: &ViewOverrides) {
        if !overrides.view_prefixes.is_empty() {
            self.views.prefixes = Some(overrides.view_prefixes.clone());
        }
        if !overrides.view_suffixes.is_empty() {
            self.views.suffixes = Some(overrides.view_suffixes.clone());
        }
        if let Some(text) = overrides.null_string.as_ref() {
            self.views.null_string = Some(text.clone());
        }
        if let Some(tag) = overrides.default_locale.as_ref() {
            self.views.default_locale = Some(tag.clone());
        }
        if let Some(zone) = overrides.time_zone.as_ref() {
            self.views.time_zone = Some(zone.clone());
        }
        if let Some(charset) = overrides.default_encoding.as_ref() {
            self.views.default_character_encoding = Some(charset.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            views,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let views = build_view_settings(views)?;

        Ok(Self {
            server,
            logging,
            views,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let resource_dir = server
        .resource_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RESOURCE_DIR));
    if resource_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "server.resource_dir",
            "path must not be empty",
        ));
    }

    Ok(ServerSettings { addr, resource_dir })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_view_settings(views: RawViewSettings) -> Result<ViewSettings, LoadError> {
    let defaults = ViewSettings::default();

    let view_prefixes = match views.prefixes {
        Some(prefixes) if prefixes.is_empty() => {
            return Err(LoadError::invalid(
                "views.prefixes",
                "at least one prefix is required; use \"\" for the root",
            ));
        }
        Some(prefixes) => prefixes
            .into_iter()
            .map(|prefix| prefix.trim_matches('/').to_string())
            .collect(),
        None => defaults.view_prefixes,
    };

    let view_suffixes = match views.suffixes {
        Some(suffixes) if suffixes.is_empty() => {
            return Err(LoadError::invalid(
                "views.suffixes",
                "at least one suffix is required",
            ));
        }
        Some(suffixes) if suffixes.iter().any(|suffix| suffix.trim().is_empty()) => {
            return Err(LoadError::invalid(
                "views.suffixes",
                "suffixes must not be empty",
            ));
        }
        Some(suffixes) => suffixes,
        None => defaults.view_suffixes,
    };

    let default_character_encoding = match views.default_character_encoding {
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| encoding.name().to_string())
            .ok_or_else(|| {
                LoadError::invalid(
                    "views.default_character_encoding",
                    format!("unknown charset `{label}`"),
                )
            })?,
        None => defaults.default_character_encoding,
    };

    let default_locale = match views.default_locale {
        Some(tag) => Locale::from_str(&tag)
            .map_err(|err| LoadError::invalid("views.default_locale", err.to_string()))?,
        None => defaults.default_locale,
    };

    let time_zone = match views.time_zone {
        Some(zone) => Tz::from_str(zone.trim()).map_err(|err| {
            LoadError::invalid(
                "views.time_zone",
                format!("unknown time zone `{zone}`: {err}"),
            )
        })?,
        None => defaults.time_zone,
    };

    Ok(ViewSettings {
        null_string: views.null_string.unwrap_or(defaults.null_string),
        view_prefixes,
        view_suffixes,
        default_character_encoding,
        default_locale,
        time_zone,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    resource_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawViewSettings {
    null_string: Option<String>,
    prefixes: Option<Vec<String>>,
    suffixes: Option<Vec<String>>,
    default_character_encoding: Option<String>,
    default_locale: Option<String>,
    time_zone: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

#[cfg(test)]
mod tests;
