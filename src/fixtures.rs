#[cfg(test)]
pub mod test {
    use crate::Populate;

    /// Shared destination type for cross-module tests: three root leaves
    /// plus a nested section.
    #[derive(Populate, Debug, PartialEq)]
    pub struct AppConfig {
        /// The application host.
        pub host: Option<String>,

        /// The port number.
        pub port: Option<u16>,

        /// Enable debug mode.
        pub debug: Option<bool>,

        /// Database settings.
        #[strata(nested)]
        pub database: Option<DbConfig>,
    }

    #[derive(Populate, Debug, PartialEq)]
    pub struct DbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        pub pool_size: Option<usize>,
    }

    #[test]
    fn vacant_builds_the_all_none_value() {
        let config = AppConfig::vacant();
        assert_eq!(config.host, None);
        assert_eq!(config.port, None);
        assert_eq!(config.debug, None);
        assert_eq!(config.database, None);
    }
}
