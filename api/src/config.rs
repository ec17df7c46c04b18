use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    pub fn from_env() -> Self {
        optional_var("ENVIRONMENT")
            .map(|env| Env::parse(env.as_str()))
            .unwrap_or(Env::Dev)
    }

    fn parse(value: &str) -> Self {
        match value {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            other => {
                tracing::warn!("Unknown ENVIRONMENT `{other}`, falling back to dev");
                Env::Dev
            }
        }
    }
}

pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub database_max_connections: usize,
    pub listen_addr: SocketAddr,
    pub cors_allowed_origin: String,
}

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_CONNECTIONS: usize = 10;

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => {
                tracing::debug!("Missing environment variable `{key}`");
                Ok(None)
            }
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Parses `raw` if present, otherwise (or when it doesn't parse) returns the default.
fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Invalid value for `{key}` ({e}), using the default");
                default
            }
        },
        None => default,
    }
}

fn optional_var(key: &str) -> Option<String> {
    var(key).unwrap_or_else(|e| {
        tracing::warn!("{e}");
        None
    })
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let listen_addr = parse_or_default(
            "LISTEN_ADDR",
            optional_var("LISTEN_ADDR"),
            DEFAULT_LISTEN_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8000))),
        );

        ServerConfig {
            env: Env::from_env(),
            database_url: required_var("DATABASE_URL"),
            database_max_connections: parse_or_default(
                "DATABASE_MAX_CONNECTIONS",
                optional_var("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            ),
            listen_addr,
            cors_allowed_origin: optional_var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == Env::Production
    }
}
