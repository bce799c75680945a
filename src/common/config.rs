use crate::common::consts::DEFAULT_MAX_ERRORS;
use crate::common::error::{Error, Result};

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Line-accurate code: folded expressions and dead branches are still emitted
    pub debug: bool,
    /// Errors tolerated before a unit is abandoned
    pub max_errors: usize,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            max_errors: DEFAULT_MAX_ERRORS,
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults overlaid with `SCRIPTC_DEBUG` and `SCRIPTC_MAX_ERRORS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("SCRIPTC_DEBUG") {
            config.debug = parse_flag("SCRIPTC_DEBUG", &v)?;
        }
        if let Ok(v) = std::env::var("SCRIPTC_MAX_ERRORS") {
            config.max_errors = v
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::config(format!("SCRIPTC_MAX_ERRORS must be a number, got '{}'", v)))?;
        }
        Ok(config)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::config(format!("{} must be a boolean, got '{}'", name, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "off").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::default().with_debug(true).with_max_errors(3);
        assert!(config.debug);
        assert_eq!(config.max_errors, 3);
    }
}
