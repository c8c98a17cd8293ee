use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

pub const DEFAULT_EXPANSION_LIMIT: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Insert sortal `instance`/`subclass` guards around quantified bodies.
    pub add_type_restrictions: bool,
    /// Holds-prefix mode; predicate variables are left for the prover.
    pub holds_prefix: bool,
    pub check_arity: bool,
    /// Cap on live candidates in the predicate/row variable loop.
    pub expansion_limit: usize,
    pub non_ascii_placeholder: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            add_type_restrictions: false,
            holds_prefix: false,
            check_arity: true,
            expansion_limit: DEFAULT_EXPANSION_LIMIT,
            non_ascii_placeholder: "_".to_string(),
        }
    }
}

impl PreprocessConfig {
    pub fn from_toml(body: &str) -> Result<Self, Diagnostic> {
        toml::from_str(body).map_err(|err| {
            Diagnostic::new("E-CONFIG", format!("invalid preprocessor config: {err}"), None)
        })
    }
}

pub fn load_config(path: &Path) -> Result<PreprocessConfig, Diagnostic> {
    let body = fs::read_to_string(path).map_err(|err| {
        Diagnostic::new(
            "E-CONFIG",
            format!("failed to read config {}: {err}", path.display()),
            None,
        )
        .with_source(path.display().to_string())
    })?;
    PreprocessConfig::from_toml(&body).map_err(|diag| diag.with_source(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = PreprocessConfig::from_toml("add_type_restrictions = true\n").expect("config");
        assert!(config.add_type_restrictions);
        assert!(config.check_arity);
        assert_eq!(config.expansion_limit, DEFAULT_EXPANSION_LIMIT);
        assert_eq!(config.non_ascii_placeholder, "_");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PreprocessConfig::from_toml("expansion_limt = 3\n").expect_err("must fail");
        assert_eq!(err.code, "E-CONFIG");
    }
}
