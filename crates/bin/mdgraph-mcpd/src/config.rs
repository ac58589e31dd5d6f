use clap::{ArgAction, Parser, builder::BoolishValueParser};
use std::env;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_URL: &str = "mem://";
const DEFAULT_DB_NAMESPACE: &str = "mdgraph";
const DEFAULT_DB_NAME: &str = "structure";
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_INGEST_ADDR: &str = "127.0.0.1:4010";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INGEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_INGEST_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
const SNAPSHOT_DIR_NAME: &str = "snapshot";

#[derive(Parser, Debug)]
#[command(name = "mdgraph-mcpd", version, about = "mdgraph MCP daemon.")]
#[allow(clippy::struct_excessive_bools)]
struct CliArgs {
    #[arg(long, env = "MDGRAPH_DB_URL", default_value = DEFAULT_DB_URL)]
    db_url: String,

    #[arg(long, env = "MDGRAPH_DB_NAMESPACE", default_value = DEFAULT_DB_NAMESPACE)]
    db_namespace: String,

    #[arg(long, env = "MDGRAPH_DB_NAME", default_value = DEFAULT_DB_NAME)]
    db_name: String,

    #[arg(long, env = "MDGRAPH_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "MDGRAPH_DB_PASSWORD")]
    db_password: Option<String>,

    #[arg(long, env = "MDGRAPH_SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Import the snapshot directory on start when the store is still empty.
    #[arg(
        long,
        env = "MDGRAPH_IMPORT_ON_START",
        default_value_t = true,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    import_on_start: bool,

    /// Import the snapshot directory and exit without serving.
    #[arg(long, env = "MDGRAPH_IMPORT_ONLY", default_value_t = false)]
    import_only: bool,

    #[arg(
        long = "stdio",
        env = "MDGRAPH_ENABLE_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "MDGRAPH_MCP_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    mcp_serve: bool,

    #[arg(
        long,
        env = "MDGRAPH_INGEST_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    ingest_serve: bool,

    #[arg(long, env = "MDGRAPH_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long, env = "MDGRAPH_INGEST_ADDR", default_value = DEFAULT_INGEST_ADDR)]
    ingest_addr: SocketAddr,

    /// Per tool call timeout in seconds; 0 disables it.
    #[arg(
        long,
        env = "MDGRAPH_TOOL_TIMEOUT_SECS",
        default_value_t = DEFAULT_TOOL_TIMEOUT_SECS
    )]
    tool_timeout_secs: u64,

    #[arg(
        long,
        env = "MDGRAPH_INGEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_INGEST_TIMEOUT_SECS
    )]
    ingest_timeout_secs: u64,

    #[arg(
        long,
        env = "MDGRAPH_INGEST_MAX_BODY_BYTES",
        default_value_t = DEFAULT_INGEST_MAX_BODY_BYTES
    )]
    ingest_max_body_bytes: usize,
}

/// Root credentials for a remote store.
#[derive(Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct MdgraphConfig {
    pub db_url: String,
    pub db_namespace: String,
    pub db_name: String,
    pub db_credentials: Option<DbCredentials>,
    pub snapshot_dir: Option<PathBuf>,
    pub import_on_start: bool,
    pub import_only: bool,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub ingest_serve: bool,
    pub mcp_http_addr: SocketAddr,
    pub ingest_addr: SocketAddr,
    pub tool_timeout: Option<Duration>,
    pub ingest_timeout: Duration,
    pub ingest_max_body_bytes: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl MdgraphConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for MdgraphConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let db_username = args.db_username.filter(|value| !value.trim().is_empty());
        let db_password = args.db_password.filter(|value| !value.trim().is_empty());
        let db_credentials = match (db_username, db_password) {
            (Some(username), Some(password)) => Some(DbCredentials { username, password }),
            (Some(_), None) => return Err(ConfigError::MissingSetting("MDGRAPH_DB_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::MissingSetting("MDGRAPH_DB_USERNAME")),
            (None, None) => None,
        };

        for (name, value) in [
            ("MDGRAPH_DB_URL", &args.db_url),
            ("MDGRAPH_DB_NAMESPACE", &args.db_namespace),
            ("MDGRAPH_DB_NAME", &args.db_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidSetting {
                    name,
                    value: value.clone(),
                });
            }
        }

        if !args.import_only && !args.enable_stdio && !args.mcp_serve && !args.ingest_serve {
            return Err(ConfigError::MissingSetting(
                "one of MDGRAPH_ENABLE_STDIO, MDGRAPH_MCP_SERVE, MDGRAPH_INGEST_SERVE",
            ));
        }

        let snapshot_dir = resolve_snapshot_dir(args.snapshot_dir);
        if args.import_only && snapshot_dir.is_none() {
            return Err(ConfigError::MissingSetting("MDGRAPH_SNAPSHOT_DIR"));
        }

        let tool_timeout = if args.tool_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.tool_timeout_secs))
        };

        Ok(Self {
            db_url: args.db_url,
            db_namespace: args.db_namespace,
            db_name: args.db_name,
            db_credentials,
            snapshot_dir,
            import_on_start: args.import_on_start,
            import_only: args.import_only,
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            ingest_serve: args.ingest_serve,
            mcp_http_addr: args.mcp_http_addr,
            ingest_addr: args.ingest_addr,
            tool_timeout,
            ingest_timeout: Duration::from_secs(args.ingest_timeout_secs),
            ingest_max_body_bytes: args.ingest_max_body_bytes,
        })
    }
}

/// Picks the snapshot directory: the explicit setting if given, otherwise a
/// `snapshot` directory next to the executable, otherwise one in the working
/// directory. Fallback candidates must exist.
fn resolve_snapshot_dir(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(dir) = explicit.filter(|dir| !dir.as_os_str().is_empty()) {
        return Some(dir);
    }
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = env::current_dir().ok();
    first_existing_snapshot_dir(exe_dir.into_iter().chain(cwd))
}

fn first_existing_snapshot_dir(bases: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    bases
        .into_iter()
        .map(|base| base.join(SNAPSHOT_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            db_url: DEFAULT_DB_URL.to_string(),
            db_namespace: DEFAULT_DB_NAMESPACE.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            db_username: None,
            db_password: None,
            snapshot_dir: Some(PathBuf::from("/data/snapshot")),
            import_on_start: true,
            import_only: false,
            enable_stdio: true,
            mcp_serve: false,
            ingest_serve: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            ingest_addr: DEFAULT_INGEST_ADDR.parse().expect("valid ingest addr"),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            ingest_timeout_secs: DEFAULT_INGEST_TIMEOUT_SECS,
            ingest_max_body_bytes: DEFAULT_INGEST_MAX_BODY_BYTES,
        }
    }

    #[test]
    fn defaults_parse() {
        let config = MdgraphConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.db_url, "mem://");
        assert!(config.db_credentials.is_none());
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("/data/snapshot")));
        assert_eq!(config.tool_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn cli_flags_parse() {
        let args = CliArgs::try_parse_from([
            "mdgraph-mcpd",
            "--db-url",
            "ws://localhost:8000",
            "--db-username",
            "root",
            "--db-password",
            "secret",
            "--snapshot-dir",
            "/srv/snapshot",
            "--import-only",
            "--stdio",
            "false",
            "--ingest-serve",
        ])
        .expect("flags should parse");
        let config = MdgraphConfig::try_from(args).expect("config should parse");
        assert_eq!(config.db_url, "ws://localhost:8000");
        assert!(config.import_only);
        assert!(!config.enable_stdio);
        assert!(config.ingest_serve);
        let credentials = config.db_credentials.expect("credentials");
        assert_eq!(credentials.username, "root");
        assert!(!format!("{credentials:?}").contains("secret"));
    }

    #[test]
    fn zero_tool_timeout_means_unbounded() {
        let mut args = base_args();
        args.tool_timeout_secs = 0;
        let config = MdgraphConfig::try_from(args).expect("config should parse");
        assert!(config.tool_timeout.is_none());
    }

    #[test]
    fn username_without_password_is_rejected() {
        let mut args = base_args();
        args.db_username = Some("root".to_string());
        let err = MdgraphConfig::try_from(args).expect_err("password is missing");
        assert!(matches!(err, ConfigError::MissingSetting("MDGRAPH_DB_PASSWORD")));
    }

    #[test]
    fn blank_namespace_is_rejected() {
        let mut args = base_args();
        args.db_namespace = "  ".to_string();
        let err = MdgraphConfig::try_from(args).expect_err("namespace is blank");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                name: "MDGRAPH_DB_NAMESPACE",
                ..
            }
        ));
    }

    #[test]
    fn nothing_to_serve_is_rejected() {
        let mut args = base_args();
        args.enable_stdio = false;
        let err = MdgraphConfig::try_from(args).expect_err("no transport enabled");
        assert!(matches!(err, ConfigError::MissingSetting(_)));
    }

    #[test]
    fn fallback_prefers_first_existing_base() {
        let first = TempDir::new().expect("tempdir");
        let second = TempDir::new().expect("tempdir");
        fs::create_dir(second.path().join(SNAPSHOT_DIR_NAME)).expect("create snapshot dir");

        let found = first_existing_snapshot_dir([
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(found, Some(second.path().join(SNAPSHOT_DIR_NAME)));

        fs::create_dir(first.path().join(SNAPSHOT_DIR_NAME)).expect("create snapshot dir");
        let found = first_existing_snapshot_dir([
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(found, Some(first.path().join(SNAPSHOT_DIR_NAME)));
    }

    #[test]
    fn fallback_ignores_plain_files() {
        let base = TempDir::new().expect("tempdir");
        fs::write(base.path().join(SNAPSHOT_DIR_NAME), "not a dir").expect("write file");
        assert!(first_existing_snapshot_dir([base.path().to_path_buf()]).is_none());
    }
}
