use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the vista binary.
#[derive(Debug, Parser)]
#[command(name = "vista", version, about = "Type-directed page rendering server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VISTA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve pages from a resource directory.
    Serve(Box<ServeArgs>),
    /// Print the template paths probed for a type chain, in lookup order.
    Candidates(CandidatesArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub views: ViewOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the directory pages are loaded from.
    #[arg(long = "resource-dir", value_name = "PATH")]
    pub resource_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ViewOverrides {
    /// Replace the configured view path prefixes. Repeat for several; pass "" for none.
    #[arg(long = "view-prefix", value_name = "PREFIX")]
    pub view_prefixes: Vec<String>,

    /// Replace the configured view path suffixes. Repeat for several.
    #[arg(long = "view-suffix", value_name = "SUFFIX")]
    pub view_suffixes: Vec<String>,

    /// Override the text rendered for null values.
    #[arg(long = "null-string", value_name = "TEXT")]
    pub null_string: Option<String>,

    /// Override the locale used when a request names none (e.g. en-US).
    #[arg(long = "default-locale", value_name = "TAG")]
    pub default_locale: Option<String>,

    /// Override the time zone dates are shown in (e.g. Europe/Berlin).
    #[arg(long = "time-zone", value_name = "ZONE")]
    pub time_zone: Option<String>,

    /// Override the charset used to decode captured byte output.
    #[arg(long = "default-encoding", value_name = "CHARSET")]
    pub default_encoding: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CandidatesArgs {
    #[command(flatten)]
    pub views: ViewOverrides,

    /// Qualified type names, most specific first (e.g. app.Person app.Base).
    #[arg(value_name = "TYPE", required = true)]
    pub types: Vec<String>,

    /// View name to look up.
    #[arg(long = "view", value_name = "NAME", default_value = "index")]
    pub view: String,
}
