use super::PaySessionConfig;

/// Apply `PAYSESSION_*` env vars on top of a loaded config.
///
/// Unparseable values are ignored and the file/default value is kept.
pub fn apply_env_overrides(config: &mut PaySessionConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

fn apply_overrides(config: &mut PaySessionConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PAYSESSION_BIND_ADDR") {
        if !v.trim().is_empty() {
            config.server.bind_addr = v;
        }
    }
    if let Some(v) = lookup("PAYSESSION_REQUEST_TIMEOUT_SECONDS") {
        if let Ok(n) = v.parse::<u64>() {
            if n > 0 {
                config.provider.request_timeout_seconds = n;
            }
        }
    }
    if let Some(v) = lookup("PAYSESSION_SECURE_COOKIE") {
        if let Ok(b) = v.parse::<bool>() {
            config.session.secure_cookie = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overrides_applied() {
        let vars = env(&[
            ("PAYSESSION_BIND_ADDR", "127.0.0.1:4000"),
            ("PAYSESSION_REQUEST_TIMEOUT_SECONDS", "7"),
            ("PAYSESSION_SECURE_COOKIE", "false"),
        ]);
        let mut config = PaySessionConfig::default();
        apply_overrides(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.server.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.provider.request_timeout_seconds, 7);
        assert!(!config.session.secure_cookie);
    }

    #[test]
    fn test_invalid_values_ignored() {
        // Zero would mean an unbounded call
        let vars = env(&[
            ("PAYSESSION_REQUEST_TIMEOUT_SECONDS", "0"),
            ("PAYSESSION_SECURE_COOKIE", "maybe"),
        ]);
        let mut config = PaySessionConfig::default();
        apply_overrides(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.provider.request_timeout_seconds, 15);
        assert!(config.session.secure_cookie);
    }
}
