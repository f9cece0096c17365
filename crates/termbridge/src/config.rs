//! Bridge configuration.

use std::env;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_NAMESPACE: &str = "termbridge";
const DEFAULT_MAX_TERMINALS: usize = 64;
const DEFAULT_DISPOSE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_EVENT_QUEUE: usize = 256;
const DEFAULT_MAX_FRAME_BYTES: usize = 1_048_576;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    namespace: String,
    max_terminals: usize,
    dispose_timeout: Duration,
    event_queue_capacity: usize,
    max_frame_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BridgeConfig {
    /// Prefix of every engine method, e.g. `termbridge.getRows`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn max_terminals(&self) -> usize {
        self.max_terminals
    }

    /// Upper bound on the remote teardown issued by `Terminal::dispose`.
    pub fn dispose_timeout(&self) -> Duration {
        self.dispose_timeout
    }

    pub fn event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    pub fn from_env() -> Self {
        Self {
            namespace: parse_env_string("TERMBRIDGE_NAMESPACE", DEFAULT_NAMESPACE),
            max_terminals: parse_env_usize("TERMBRIDGE_MAX_TERMINALS", DEFAULT_MAX_TERMINALS),
            dispose_timeout: Duration::from_millis(parse_env_u64(
                "TERMBRIDGE_DISPOSE_TIMEOUT_MS",
                DEFAULT_DISPOSE_TIMEOUT_MS,
            )),
            event_queue_capacity: parse_env_usize("TERMBRIDGE_EVENT_QUEUE", DEFAULT_EVENT_QUEUE)
                .max(1),
            max_frame_bytes: parse_env_usize("TERMBRIDGE_MAX_FRAME_BYTES", DEFAULT_MAX_FRAME_BYTES),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_max_terminals(mut self, max: usize) -> Self {
        self.max_terminals = max;
        self
    }

    pub fn with_dispose_timeout(mut self, timeout: Duration) -> Self {
        self.dispose_timeout = timeout;
        self
    }

    pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

fn parse_env_string(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    if value.trim().is_empty() {
        return default;
    }
    match value.trim().parse::<usize>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return default,
    };
    if value.trim().is_empty() {
        return default;
    }
    match value.trim().parse::<u64>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(value = %value, key, "Invalid numeric config; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests below touch process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = env::var(key).ok();
            env::set_var(key, value);
            Self { key, prev }
        }

        fn remove(key: &'static str) -> Self {
            let prev = env::var(key).ok();
            env::remove_var(key);
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.prev.take() {
                Some(prev) => env::set_var(self.key, prev),
                None => env::remove_var(self.key),
            }
        }
    }

    fn clean_env() -> Vec<EnvGuard> {
        [
            "TERMBRIDGE_NAMESPACE",
            "TERMBRIDGE_MAX_TERMINALS",
            "TERMBRIDGE_DISPOSE_TIMEOUT_MS",
            "TERMBRIDGE_EVENT_QUEUE",
            "TERMBRIDGE_MAX_FRAME_BYTES",
        ]
        .into_iter()
        .map(EnvGuard::remove)
        .collect()
    }

    #[test]
    fn test_default_config() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();

        let config = BridgeConfig::default();
        assert_eq!(config.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(config.max_terminals(), DEFAULT_MAX_TERMINALS);
        assert_eq!(
            config.dispose_timeout(),
            Duration::from_millis(DEFAULT_DISPOSE_TIMEOUT_MS)
        );
        assert_eq!(config.event_queue_capacity(), DEFAULT_EVENT_QUEUE);
        assert_eq!(config.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BridgeConfig::default()
            .with_namespace("webterm")
            .with_max_terminals(2)
            .with_dispose_timeout(Duration::from_millis(250))
            .with_event_queue_capacity(0)
            .with_max_frame_bytes(4096);

        assert_eq!(config.namespace(), "webterm");
        assert_eq!(config.max_terminals(), 2);
        assert_eq!(config.dispose_timeout(), Duration::from_millis(250));
        assert_eq!(config.event_queue_capacity(), 1);
        assert_eq!(config.max_frame_bytes(), 4096);
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _ns = EnvGuard::set("TERMBRIDGE_NAMESPACE", " xterm ");
        let _max = EnvGuard::set("TERMBRIDGE_MAX_TERMINALS", "8");
        let _timeout = EnvGuard::set("TERMBRIDGE_DISPOSE_TIMEOUT_MS", "1500");

        let config = BridgeConfig::from_env();
        assert_eq!(config.namespace(), "xterm");
        assert_eq!(config.max_terminals(), 8);
        assert_eq!(config.dispose_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_env_uses_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = clean_env();
        let _max = EnvGuard::set("TERMBRIDGE_MAX_TERMINALS", "many");
        let _timeout = EnvGuard::set("TERMBRIDGE_DISPOSE_TIMEOUT_MS", "-1");
        let _queue = EnvGuard::set("TERMBRIDGE_EVENT_QUEUE", "");

        let config = BridgeConfig::from_env();
        assert_eq!(config.max_terminals(), DEFAULT_MAX_TERMINALS);
        assert_eq!(
            config.dispose_timeout(),
            Duration::from_millis(DEFAULT_DISPOSE_TIMEOUT_MS)
        );
        assert_eq!(config.event_queue_capacity(), DEFAULT_EVENT_QUEUE);
    }
}
