//! Simulation scenarios.

use serde::{Deserialize, Serialize};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Wait for a duration.
    Wait { millis: u64 },
    /// Seed a user's token balance.
    Seed {
        user: usize,
        token: String,
        amount: String,
    },
    /// Request a conversion for a user.
    Convert {
        user: usize,
        token: String,
        amount: String,
    },
    /// Request several conversions for one user concurrently.
    ConvertConcurrently {
        user: usize,
        token: String,
        amounts: Vec<String>,
    },
    /// Fail the next N settlement commits with write conflicts.
    InjectConflicts { count: u32 },
    /// Fail the next N settlement commits with storage errors.
    InjectStorageErrors { count: u32 },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// The user's newest conversion completed.
    LastConversionCompleted { user: usize },
    /// The user's newest conversion failed.
    LastConversionFailed { user: usize },
    /// The user's token balance equals an amount.
    CryptoBalanceEquals {
        user: usize,
        token: String,
        amount: String,
    },
    /// The user's naira balance equals an amount.
    NairaBalanceEquals { user: usize, amount: String },
    /// The journal holds exactly N rows.
    JournalCount { count: usize },
    /// Completed/failed conversion counts for a user.
    ConversionCounts {
        user: usize,
        completed: usize,
        failed: usize,
    },
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "happy-path" => Ok(Self::happy_path()),
            "concurrent-overdraw" => Ok(Self::concurrent_overdraw()),
            "conflict-retry" => Ok(Self::conflict_retry()),
            "conflict-exhaustion" => Ok(Self::conflict_exhaustion()),
            "mixed-load" => Ok(Self::mixed_load()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {name}")),
        }
    }

    /// Names of all built-in scenarios.
    pub fn builtin_names() -> &'static [&'static str] {
        &[
            "happy-path",
            "concurrent-overdraw",
            "conflict-retry",
            "conflict-exhaustion",
            "mixed-load",
        ]
    }

    /// One conversion at the reference rate: 10 USDC at 1500/1% nets 14850.
    fn happy_path() -> Self {
        Self {
            name: "happy-path".to_string(),
            description: "Single conversion settles and nets 14850 NGN".to_string(),
            steps: vec![
                ScenarioStep::Seed {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "25".to_string(),
                },
                ScenarioStep::Convert {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "10".to_string(),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::LastConversionCompleted { user: 0 },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CryptoBalanceEquals {
                        user: 0,
                        token: "USDC".to_string(),
                        amount: "15".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::NairaBalanceEquals {
                        user: 0,
                        amount: "14850.00".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::JournalCount { count: 1 },
                },
            ],
        }
    }

    /// Two concurrent conversions that jointly overdraw the balance.
    fn concurrent_overdraw() -> Self {
        Self {
            name: "concurrent-overdraw".to_string(),
            description: "Concurrent conversions settle exactly one when their sum overdraws"
                .to_string(),
            steps: vec![
                ScenarioStep::Seed {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "15".to_string(),
                },
                ScenarioStep::ConvertConcurrently {
                    user: 0,
                    token: "USDC".to_string(),
                    amounts: vec!["10".to_string(), "10".to_string()],
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CryptoBalanceEquals {
                        user: 0,
                        token: "USDC".to_string(),
                        amount: "5".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::JournalCount { count: 1 },
                },
            ],
        }
    }

    /// Conflicts on the first two attempts, success on the third.
    fn conflict_retry() -> Self {
        Self {
            name: "conflict-retry".to_string(),
            description: "Settlement retries through two write conflicts".to_string(),
            steps: vec![
                ScenarioStep::Seed {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "25".to_string(),
                },
                ScenarioStep::InjectConflicts { count: 2 },
                ScenarioStep::Convert {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "10".to_string(),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::LastConversionCompleted { user: 0 },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::JournalCount { count: 1 },
                },
            ],
        }
    }

    /// Conflicts on every attempt; the conversion fails with no mutation.
    fn conflict_exhaustion() -> Self {
        Self {
            name: "conflict-exhaustion".to_string(),
            description: "Exhausted retries fail the conversion without moving balances"
                .to_string(),
            steps: vec![
                ScenarioStep::Seed {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "25".to_string(),
                },
                ScenarioStep::InjectConflicts { count: 3 },
                ScenarioStep::Convert {
                    user: 0,
                    token: "USDC".to_string(),
                    amount: "10".to_string(),
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::LastConversionFailed { user: 0 },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::CryptoBalanceEquals {
                        user: 0,
                        token: "USDC".to_string(),
                        amount: "25".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::NairaBalanceEquals {
                        user: 0,
                        amount: "0".to_string(),
                    },
                },
                ScenarioStep::Assert {
                    condition: AssertCondition::JournalCount { count: 0 },
                },
            ],
        }
    }

    /// Several users converting with an occasional injected conflict.
    fn mixed_load() -> Self {
        let mut steps = vec![];
        for user in 0..3 {
            steps.push(ScenarioStep::Seed {
                user,
                token: "USDC".to_string(),
                amount: "100".to_string(),
            });
        }
        steps.push(ScenarioStep::InjectConflicts { count: 1 });
        for round in 0..3 {
            for user in 0..3 {
                steps.push(ScenarioStep::Convert {
                    user,
                    token: "USDC".to_string(),
                    amount: format!("{}", 5 + round),
                });
            }
            steps.push(ScenarioStep::Wait { millis: 20 });
        }
        steps.push(ScenarioStep::Assert {
            condition: AssertCondition::JournalCount { count: 9 },
        });

        Self {
            name: "mixed-load".to_string(),
            description: "Three users converting across rounds with one injected conflict"
                .to_string(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_load() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(&scenario.name, name);
            assert!(!scenario.steps.is_empty());
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(Scenario::load("nope").is_err());
    }
}
