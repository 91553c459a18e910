use std::{
    env,
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

/// Service configuration, built once from the environment at startup and
/// passed by reference everywhere. Nothing reads the environment after
/// this point, so timeouts and toolchain paths are test-injectable.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub max_concurrency: usize,
    pub log_level: String,
    pub runner: RunnerConfig,
}

/// Knobs shared by every language adapter.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock budget per request, compile time included.
    pub timeout: Duration,
    /// Byte cap applied to each captured stream.
    pub max_output_bytes: usize,
    /// Where per-request scratch directories are created.
    pub workspace_root: PathBuf,
    pub toolchain: ToolchainConfig,
}

/// Program names (or absolute paths) for the host toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub python: String,
    pub javac: String,
    pub java: String,
    pub cxx: String,
    pub cc: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_parse("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080))),
            max_concurrency: env_parse("MAX_CONCURRENCY", 16usize).max(1),
            log_level: env_string("LOG_LEVEL", "info"),
            runner: RunnerConfig {
                timeout: Duration::from_millis(env_parse("RUN_TIMEOUT_MS", 10_000u64)),
                max_output_bytes: env_parse("MAX_OUTPUT_BYTES", 1024 * 1024usize),
                workspace_root: env::var("WORKSPACE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
                toolchain: ToolchainConfig {
                    python: env_string("PYTHON_BIN", "python3"),
                    javac: env_string("JAVAC_BIN", "javac"),
                    java: env_string("JAVA_BIN", "java"),
                    cxx: env_string("CXX_BIN", "g++"),
                    cc: env_string("CC_BIN", "gcc"),
                },
            },
        }
    }
}

impl RunnerConfig {
    /// The fixed human-readable message reported when the budget expires.
    pub fn timeout_message(&self) -> String {
        format!("Timeout ({}s)", self.timeout.as_secs())
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
