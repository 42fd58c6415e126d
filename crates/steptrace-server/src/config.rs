//! Server configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::executor::Executor;

const WORKER_BIN: &str = if cfg!(windows) { "steptrace.exe" } else { "steptrace" };

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Deadline for requests that do not name one.
    pub default_timeout: Duration,
    /// Largest deadline a request may ask for.
    pub max_timeout: Duration,
    pub executor: Executor,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8000,
            default_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(120),
            executor: Executor::Subprocess {
                worker: default_worker(),
            },
        }
    }
}

impl ServerConfig {
    /// Reads:
    /// - `STEPTRACE_PORT`: listen port (default: 8000)
    /// - `STEPTRACE_TIMEOUT_SECS`: default deadline (default: 30)
    /// - `STEPTRACE_MAX_TIMEOUT_SECS`: largest accepted deadline (default: 120)
    /// - `STEPTRACE_EXECUTOR`: `subprocess` or `inline` (default: subprocess)
    /// - `STEPTRACE_WORKER`: path of the `steptrace` binary (default: next to
    ///   this executable)
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        let worker = std::env::var("STEPTRACE_WORKER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_worker());
        let executor = match std::env::var("STEPTRACE_EXECUTOR").as_deref() {
            Ok("inline") => Executor::Inline,
            Ok("subprocess") | Err(_) => Executor::Subprocess { worker },
            Ok(other) => {
                tracing::warn!(executor = other, "unknown executor, using subprocess");
                Executor::Subprocess { worker }
            }
        };
        ServerConfig {
            port: env_or("STEPTRACE_PORT", defaults.port),
            default_timeout: Duration::from_secs(env_or(
                "STEPTRACE_TIMEOUT_SECS",
                defaults.default_timeout.as_secs(),
            )),
            max_timeout: Duration::from_secs(env_or(
                "STEPTRACE_MAX_TIMEOUT_SECS",
                defaults.max_timeout.as_secs(),
            )),
            executor,
        }
    }

    /// A configuration that traces on the server's own blocking pool.
    pub fn inline() -> Self {
        ServerConfig {
            executor: Executor::Inline,
            ..ServerConfig::default()
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

fn default_worker() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_BIN)))
        .unwrap_or_else(|| PathBuf::from(WORKER_BIN))
}
