use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("YILDIZ_DATABASE_URL")
            && !url.is_empty()
        {
            self.database.url = url;
        }

        if let Ok(port_str) =
            std::env::var("YILDIZ_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) = std::env::var("YILDIZ_GATEWAY_HOST")
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(level) = std::env::var("YILDIZ_LOG_LEVEL")
            && !level.is_empty()
        {
            self.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    const OVERRIDE_VARS: [&str; 5] = [
        "YILDIZ_DATABASE_URL",
        "YILDIZ_GATEWAY_PORT",
        "PORT",
        "YILDIZ_GATEWAY_HOST",
        "YILDIZ_LOG_LEVEL",
    ];

    static ENV: Mutex<()> = Mutex::new(());

    /// Exclusive access to the override variables. Starts with all of them
    /// cleared and restores the previous process values on drop.
    struct YildizEnv {
        saved: Vec<(&'static str, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl YildizEnv {
        fn clean() -> Self {
            let lock = ENV.lock().unwrap_or_else(PoisonError::into_inner);
            let saved = OVERRIDE_VARS
                .into_iter()
                .map(|key| (key, std::env::var(key).ok()))
                .collect();
            for key in OVERRIDE_VARS {
                // SAFETY: `ENV` serializes every test that touches these vars.
                unsafe { std::env::remove_var(key) };
            }
            Self { saved, _lock: lock }
        }

        fn set(&self, key: &'static str, value: &str) {
            assert!(OVERRIDE_VARS.contains(&key), "{key} is not restored");
            // SAFETY: `ENV` is held for the lifetime of `self`.
            unsafe { std::env::set_var(key, value) };
        }

        fn overridden() -> Config {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    }

    impl Drop for YildizEnv {
        fn drop(&mut self) {
            for (key, previous) in &self.saved {
                // SAFETY: `_lock` is released only after this body runs.
                match previous {
                    Some(value) => unsafe { std::env::set_var(key, value) },
                    None => unsafe { std::env::remove_var(key) },
                }
            }
        }
    }

    #[test]
    fn env_values_replace_file_values() {
        let env = YildizEnv::clean();
        env.set("YILDIZ_DATABASE_URL", "sqlite:/tmp/env.db");
        env.set("YILDIZ_GATEWAY_PORT", "4100");
        env.set("YILDIZ_LOG_LEVEL", "debug");

        let config = YildizEnv::overridden();
        assert_eq!(config.database.url, "sqlite:/tmp/env.db");
        assert_eq!(config.gateway.port, 4100);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn bare_port_is_used_when_gateway_port_is_unset() {
        let env = YildizEnv::clean();
        env.set("PORT", "8088");
        assert_eq!(YildizEnv::overridden().gateway.port, 8088);

        env.set("YILDIZ_GATEWAY_PORT", "4200");
        assert_eq!(YildizEnv::overridden().gateway.port, 4200);
    }

    #[test]
    fn unparsable_port_and_empty_url_are_ignored() {
        let env = YildizEnv::clean();
        env.set("YILDIZ_DATABASE_URL", "");
        env.set("YILDIZ_GATEWAY_PORT", "not-a-port");

        let config = YildizEnv::overridden();
        assert_eq!(config.database.url, Config::default().database.url);
        assert_eq!(config.gateway.port, 3058);
        assert_eq!(config.log_level, "info");
    }
}
