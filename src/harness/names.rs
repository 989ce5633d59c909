use rand::distributions::{Alphanumeric, DistString};
use std::collections::VecDeque;

use crate::error::{ScenarioError, ScenarioResult};

/// Produces resource names; replays recorded names during playback
#[derive(Debug, Clone)]
pub enum NameGenerator {
    Random { generated: Vec<String> },
    Replay { remaining: VecDeque<String> },
}

impl NameGenerator {
    pub fn random() -> Self {
        NameGenerator::Random {
            generated: Vec::new(),
        }
    }

    pub fn replay(names: Vec<String>) -> Self {
        NameGenerator::Replay {
            remaining: names.into(),
        }
    }

    /// Create a lowercase name of exactly `length` characters starting with `prefix`
    pub fn create(&mut self, prefix: &str, length: usize) -> ScenarioResult<String> {
        if prefix.len() >= length {
            return Err(ScenarioError::InvalidName {
                prefix: prefix.to_string(),
                length,
            });
        }

        match self {
            NameGenerator::Random { generated } => {
                let suffix = Alphanumeric
                    .sample_string(&mut rand::thread_rng(), length - prefix.len())
                    .to_lowercase();
                let name = format!("{prefix}{suffix}");
                generated.push(name.clone());
                Ok(name)
            }
            NameGenerator::Replay { remaining } => {
                let name = remaining
                    .pop_front()
                    .ok_or_else(|| ScenarioError::NamesExhausted {
                        prefix: prefix.to_string(),
                    })?;
                if !name.starts_with(prefix) {
                    tracing::warn!(
                        "Recorded name '{}' does not start with requested prefix '{}'",
                        name,
                        prefix
                    );
                }
                Ok(name)
            }
        }
    }

    /// Names produced so far, in order (empty while replaying)
    pub fn generated(&self) -> &[String] {
        match self {
            NameGenerator::Random { generated } => generated,
            NameGenerator::Replay { .. } => &[],
        }
    }
}
