use std::path::PathBuf;

use hook_std::env::ReadEnv;
use tracing::warn;

const ENV_NATS_URL: &str = "NATS_URL";
const ENV_NATS_CREDS: &str = "NATS_CREDS";
const ENV_NATS_NKEY: &str = "NATS_NKEY";
const ENV_NATS_USER: &str = "NATS_USER";
const ENV_NATS_PASSWORD: &str = "NATS_PASSWORD";
const ENV_NATS_TOKEN: &str = "NATS_TOKEN";
const ENV_NATS_TLS_REQUIRED: &str = "NATS_TLS_REQUIRED";
const ENV_NATS_TLS_CA_FILE: &str = "NATS_TLS_CA_FILE";
const ENV_NATS_TLS_CERT_FILE: &str = "NATS_TLS_CERT_FILE";
const ENV_NATS_TLS_KEY_FILE: &str = "NATS_TLS_KEY_FILE";

const DEFAULT_NATS_URL: &str = "localhost:4222";

/// NATS authentication method.
///
/// When resolved from environment variables, priority order is:
/// 1. Credentials file (`NATS_CREDS`)
/// 2. NKey (`NATS_NKEY`)
/// 3. User/Password (`NATS_USER` + `NATS_PASSWORD`)
/// 4. Token (`NATS_TOKEN`)
/// 5. No auth
#[derive(Debug, Clone)]
pub enum NatsAuth {
    Credentials(PathBuf),
    NKey(String),
    UserPassword { user: String, password: String },
    Token(String),
    None,
}

impl NatsAuth {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "credentials file",
            Self::NKey(_) => "NKey",
            Self::UserPassword { .. } => "user/password",
            Self::Token(_) => "token",
            Self::None => "none",
        }
    }
}

/// Client certificate and its private key, both PEM files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Broker TLS settings.
///
/// Supplying a CA file or a client certificate implies TLS even when
/// `required` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NatsTls {
    pub required: bool,
    pub ca_file: Option<PathBuf>,
    pub client_cert: Option<ClientCertificate>,
}

impl NatsTls {
    pub fn is_enabled(&self) -> bool {
        self.required || self.ca_file.is_some() || self.client_cert.is_some()
    }

    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        let client_cert = match (
            env.var(ENV_NATS_TLS_CERT_FILE),
            env.var(ENV_NATS_TLS_KEY_FILE),
        ) {
            (Ok(cert), Ok(key)) => Some(ClientCertificate {
                cert: cert.into(),
                key: key.into(),
            }),
            _ => None,
        };

        Self {
            required: env.flag(ENV_NATS_TLS_REQUIRED).unwrap_or(false),
            ca_file: env.var(ENV_NATS_TLS_CA_FILE).ok().map(PathBuf::from),
            client_cert,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub servers: Vec<String>,
    pub auth: NatsAuth,
    pub tls: NatsTls,
}

impl NatsConfig {
    /// Build config from environment variables.
    ///
    /// - `NATS_URL`: comma-separated server list (default: `localhost:4222`).
    ///   Entries that are not `[scheme://]host:port` are dropped.
    /// - Auth resolved via `NATS_CREDS` > `NATS_NKEY` > `NATS_USER`+`NATS_PASSWORD` > `NATS_TOKEN` > none
    /// - TLS via `NATS_TLS_REQUIRED`, `NATS_TLS_CA_FILE`, `NATS_TLS_CERT_FILE` + `NATS_TLS_KEY_FILE`
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            servers: servers_from_env(env),
            auth: auth_from_env(env),
            tls: NatsTls::from_env(env),
        }
    }
}

fn servers_from_env<E: ReadEnv>(env: &E) -> Vec<String> {
    let raw = env
        .var(ENV_NATS_URL)
        .unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let valid = is_server_address(s);
            if !valid {
                warn!(address = %s, "Ignoring malformed NATS server address");
            }
            valid
        })
        .map(str::to_string)
        .collect()
}

/// `host:port` with an optional `scheme://` prefix and a non-zero port.
fn is_server_address(address: &str) -> bool {
    let host_port = address
        .split_once("://")
        .map_or(address, |(_, rest)| rest);
    let Some((host, port)) = host_port.rsplit_once(':') else {
        return false;
    };
    !host.is_empty()
        && !host.contains(|c: char| c.is_whitespace() || c == '/')
        && port.parse::<u16>().is_ok_and(|p| p > 0)
}

fn auth_from_env<E: ReadEnv>(env: &E) -> NatsAuth {
    if let Ok(creds_path) = env.var(ENV_NATS_CREDS) {
        return NatsAuth::Credentials(PathBuf::from(creds_path));
    }
    if let Ok(nkey) = env.var(ENV_NATS_NKEY) {
        return NatsAuth::NKey(nkey);
    }
    if let (Ok(user), Ok(password)) = (env.var(ENV_NATS_USER), env.var(ENV_NATS_PASSWORD)) {
        return NatsAuth::UserPassword { user, password };
    }
    if let Ok(token) = env.var(ENV_NATS_TOKEN) {
        return NatsAuth::Token(token);
    }
    NatsAuth::None
}
