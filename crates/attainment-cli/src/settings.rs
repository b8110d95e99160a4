//! Run configuration layering
//!
//! Sources, lowest to highest precedence: built-in defaults, an optional
//! TOML file, command-line flags. The merged result is validated once.

use anyhow::{Context, Result};
use attainment_core::{AttainmentConfig, ScoreWeights, TARGET_COUNT};
use std::path::Path;

/// Values given on the command line
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigOverrides {
    pub targets: Option<[i32; TARGET_COUNT]>,
    pub score_weights: Option<[i32; 2]>,
    pub expectation: Option<f64>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut AttainmentConfig) {
        if let Some(targets) = self.targets {
            config.target_weights = targets;
        }
        if let Some([regular, final_exam]) = self.score_weights {
            config.score_weights = ScoreWeights {
                regular,
                final_exam,
            };
        }
        if let Some(expectation) = self.expectation {
            config.expectation = expectation;
        }
    }
}

/// Parse a comma-separated list of exactly `N` integer percentages.
pub fn parse_weights<const N: usize>(value: &str) -> Result<[i32; N], String> {
    let parsed = value
        .split(',')
        .map(|part| {
            part.trim()
                .trim_end_matches('%')
                .parse::<i32>()
                .map_err(|_| format!("'{}' is not an integer percentage", part.trim()))
        })
        .collect::<Result<Vec<i32>, String>>()?;

    let count = parsed.len();
    parsed
        .try_into()
        .map_err(|_| format!("expected {} comma-separated weights, got {}", N, count))
}

/// Merge defaults, the optional config file and command-line overrides.
pub fn load_config(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<AttainmentConfig> {
    let mut config = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => AttainmentConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn weights_parse() {
        assert_eq!(parse_weights::<3>("50,30,20"), Ok([50, 30, 20]));
        assert_eq!(parse_weights::<2>(" 30% , 70% "), Ok([30, 70]));
        assert!(parse_weights::<3>("50,50").unwrap_err().contains("expected 3"));
        assert!(parse_weights::<2>("a,100").unwrap_err().contains("'a'"));
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = load_config(None, &ConfigOverrides::default()).unwrap();
        assert_eq!(config, AttainmentConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target_weights = [40, 40, 20]\nexpectation = 0.7").unwrap();

        let overrides = ConfigOverrides {
            expectation: Some(0.65),
            ..ConfigOverrides::default()
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.target_weights, [40, 40, 20]);
        assert_eq!(config.expectation, 0.65);
        assert_eq!(config.score_weights, ScoreWeights::default());
    }

    #[test]
    fn merged_config_is_validated() {
        let overrides = ConfigOverrides {
            targets: Some([50, 30, 21]),
            ..ConfigOverrides::default()
        };
        let err = load_config(None, &overrides).unwrap_err();
        assert!(format!("{:#}", err).contains("101"));
    }

    #[test]
    fn unreadable_config_file_reported() {
        let err = load_config(
            Some(Path::new("/nonexistent/attainment.toml")),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
