//! Application settings bound from the environment.
//!
//! Loaded once at startup, before the logging system is constructed.
//! Missing variables fall back to the documented defaults.

use envconfig::Envconfig;

use crate::logging::record::Level;

#[derive(Envconfig, Debug, Clone)]
pub struct Settings {
    #[envconfig(from = "ENVIRONMENT", default = "dev")]
    pub environment: String,

    #[envconfig(from = "WORKERS", default = "1")]
    pub workers: usize,

    /// Minimum severity; records below it never reach the chain.
    #[envconfig(from = "LOG_LEVEL", default = "INFO")]
    pub log_level: Level,

    /// true selects the structured (one JSON object per line) renderer,
    /// false the human console renderer.
    #[envconfig(from = "LOG_JSON_FORMAT", default = "false")]
    pub log_json_format: bool,

    /// Whether the human renderer may emit ANSI color codes.
    #[envconfig(from = "LOG_COLOR", default = "true")]
    pub log_color: bool,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = Settings::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(settings.environment, "dev");
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.log_level, Level::Info);
        assert!(!settings.log_json_format);
        assert!(settings.log_color);
    }

    #[test]
    fn fatal_parses_as_critical() {
        let mut env = HashMap::new();
        env.insert("LOG_LEVEL".to_string(), "FATAL".to_string());
        let settings = Settings::init_from_hashmap(&env).unwrap();
        assert_eq!(settings.log_level, Level::Critical);
    }
}
