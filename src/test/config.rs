#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::env::{AppConfig, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS};

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        temp_env::with_vars_unset(["DATABASE_URL", "DATABASE_MAX_CONNECTIONS"], || {
            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
            assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        });
    }

    #[test]
    #[serial]
    fn test_values_from_environment() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite://other.db")),
                ("DATABASE_MAX_CONNECTIONS", Some("12")),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.database_url, "sqlite://other.db");
                assert_eq!(config.max_connections, 12);
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_url_falls_back_to_default() {
        temp_env::with_var("DATABASE_URL", Some("   "), || {
            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_pool_size_is_rejected() {
        for raw in ["0", "-3", "many"] {
            temp_env::with_var("DATABASE_MAX_CONNECTIONS", Some(raw), || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(
                    err.to_string()
                        .contains("DATABASE_MAX_CONNECTIONS must be a positive integer"),
                    "unexpected error for {}: {}",
                    raw,
                    err
                );
            });
        }
    }
}
