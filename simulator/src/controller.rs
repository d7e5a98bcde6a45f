//! Simulation controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{info, warn};

use stablesettle_common::{ConversionStatus, CurrencyPair, TokenSymbol};
use stablesettle_engine::{ConversionService, EngineConfig};
use stablesettle_ledger::LedgerStore;
use stablesettle_rates::{parse_amount, RateSource, RateStore};

use crate::accounts::{SimulatedUser, UserFactory};
use crate::metrics::SimulationMetrics;
use crate::scenario::{AssertCondition, Scenario, ScenarioStep};

/// Controls the simulation.
pub struct SimulationController {
    /// Number of users.
    user_count: usize,
    /// Ledger store under test.
    store: Arc<LedgerStore>,
    /// Rate store.
    rates: Arc<RateStore>,
    /// The engine service.
    service: Arc<ConversionService>,
    /// Onboarded users.
    users: Vec<SimulatedUser>,
    /// Simulation metrics.
    metrics: SimulationMetrics,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(user_count: usize, config: EngineConfig) -> Self {
        let store = Arc::new(LedgerStore::new());
        let rates = Arc::new(RateStore::new());
        let service = Arc::new(ConversionService::new(
            Arc::clone(&store),
            Arc::clone(&rates),
            config,
        ));

        Self {
            user_count,
            store,
            rates,
            service,
            users: Vec::new(),
            metrics: SimulationMetrics::new(),
        }
    }

    /// Initialize the simulation: active rate plus onboarded users.
    pub fn initialize(&mut self, rate: Decimal, fee_percent: Decimal) -> anyhow::Result<()> {
        self.rates.set_active_rate(
            CurrencyPair::usd_ngn(),
            rate,
            fee_percent,
            "simulator",
            RateSource::Manual,
        )?;

        self.users = UserFactory::create_users(&self.store, self.user_count);
        info!(
            users = self.users.len(),
            rate = %rate,
            fee_percent = %fee_percent,
            "Simulation initialized"
        );
        Ok(())
    }

    /// Run a scenario.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<()> {
        info!(
            scenario = %scenario.name,
            description = %scenario.description,
            "Running scenario"
        );

        for step in &scenario.steps {
            self.execute_step(step).await?;
        }

        info!(scenario = %scenario.name, "Scenario complete");
        Ok(())
    }

    /// Run randomly generated conversions across all users.
    pub async fn run_random(&mut self, conversions: u64, seed: Option<u64>) -> anyhow::Result<()> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        // Fund everyone generously so most conversions settle.
        for idx in 0..self.users.len() {
            self.seed_balance(idx, &TokenSymbol::usdc(), Decimal::from(1_000))
                .await?;
        }

        for _ in 0..conversions {
            let user = rng.gen_range(0..self.users.len());
            let amount = Decimal::from(rng.gen_range(1..50));
            self.convert(user, &TokenSymbol::usdc(), &amount.to_string())
                .await?;
        }

        Ok(())
    }

    /// Get the collected metrics.
    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    /// Engine metrics in Prometheus text format.
    pub fn engine_metrics(&self) -> String {
        self.service.metrics().to_prometheus()
    }

    async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Wait { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await;
            }
            ScenarioStep::Seed {
                user,
                token,
                amount,
            } => {
                let amount = parse_amount(amount)?;
                self.seed_balance(*user, &TokenSymbol::new(token), amount)
                    .await?;
            }
            ScenarioStep::Convert {
                user,
                token,
                amount,
            } => {
                self.convert(*user, &TokenSymbol::new(token), amount).await?;
            }
            ScenarioStep::ConvertConcurrently {
                user,
                token,
                amounts,
            } => {
                self.convert_concurrently(*user, &TokenSymbol::new(token), amounts)
                    .await?;
            }
            ScenarioStep::InjectConflicts { count } => {
                info!(count, "Injecting commit conflicts");
                self.store.faults().inject_commit_conflicts(*count);
            }
            ScenarioStep::InjectStorageErrors { count } => {
                info!(count, "Injecting storage errors");
                self.store.faults().inject_commit_errors(*count);
            }
            ScenarioStep::Assert { condition } => {
                self.check(condition).await?;
                self.metrics.record_assertion();
            }
        }
        Ok(())
    }

    async fn seed_balance(
        &self,
        user_idx: usize,
        token: &TokenSymbol,
        amount: Decimal,
    ) -> anyhow::Result<()> {
        let user = self.user(user_idx)?;
        self.store
            .credit_crypto_balance(user.crypto_wallet, token, amount, amount.to_string())
            .await;
        info!(user = %user.user_id, token = %token, amount = %amount, "Balance seeded");
        Ok(())
    }

    async fn convert(
        &mut self,
        user_idx: usize,
        token: &TokenSymbol,
        amount: &str,
    ) -> anyhow::Result<()> {
        let user_id = self.user(user_idx)?.user_id.clone();
        let started = Instant::now();

        match self.service.request_conversion(&user_id, token, amount).await {
            Ok(outcome) => {
                info!(
                    user = %user_id,
                    reference = %outcome.conversion.reference,
                    net_naira = %outcome.conversion.net_naira,
                    "Conversion completed"
                );
                self.metrics
                    .record_completed(started.elapsed().as_millis() as u64);
            }
            Err(error) => {
                warn!(
                    user = %user_id,
                    code = error.error_code(),
                    message = %error.user_message(),
                    "Conversion failed"
                );
                self.metrics.record_failed();
            }
        }
        Ok(())
    }

    async fn convert_concurrently(
        &mut self,
        user_idx: usize,
        token: &TokenSymbol,
        amounts: &[String],
    ) -> anyhow::Result<()> {
        let user_id = self.user(user_idx)?.user_id.clone();
        let started = Instant::now();

        let handles: Vec<_> = amounts
            .iter()
            .map(|amount| {
                let service = Arc::clone(&self.service);
                let user_id = user_id.clone();
                let token = token.clone();
                let amount = amount.clone();
                tokio::spawn(async move {
                    service.request_conversion(&user_id, &token, &amount).await
                })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            match result? {
                Ok(_) => self
                    .metrics
                    .record_completed(started.elapsed().as_millis() as u64),
                Err(error) => {
                    warn!(
                        user = %user_id,
                        code = error.error_code(),
                        "Concurrent conversion failed"
                    );
                    self.metrics.record_failed();
                }
            }
        }
        Ok(())
    }

    async fn check(&self, condition: &AssertCondition) -> anyhow::Result<()> {
        match condition {
            AssertCondition::LastConversionCompleted { user } => {
                let status = self.last_conversion_status(*user)?;
                anyhow::ensure!(
                    status == ConversionStatus::Completed,
                    "expected COMPLETED, found {status:?}"
                );
            }
            AssertCondition::LastConversionFailed { user } => {
                let status = self.last_conversion_status(*user)?;
                anyhow::ensure!(
                    status == ConversionStatus::Failed,
                    "expected FAILED, found {status:?}"
                );
            }
            AssertCondition::CryptoBalanceEquals {
                user,
                token,
                amount,
            } => {
                let wallet = self.user(*user)?.crypto_wallet;
                let expected = parse_amount(amount)?;
                let balance = self
                    .store
                    .crypto_balance(wallet, &TokenSymbol::new(token))
                    .await
                    .map(|b| b.balance)
                    .unwrap_or(Decimal::ZERO);
                anyhow::ensure!(
                    balance == expected,
                    "expected {token} balance {expected}, found {balance}"
                );
            }
            AssertCondition::NairaBalanceEquals { user, amount } => {
                let wallet = self.user(*user)?.naira_wallet;
                let expected: Decimal = amount.parse()?;
                let row = self
                    .store
                    .wallet(wallet)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("naira wallet missing"))?;
                anyhow::ensure!(
                    row.balance == expected && row.ledger_balance == expected,
                    "expected naira balance {expected}, found {} (ledger {})",
                    row.balance,
                    row.ledger_balance
                );
            }
            AssertCondition::JournalCount { count } => {
                let actual = self.store.journal_len();
                anyhow::ensure!(actual == *count, "expected {count} journal rows, found {actual}");
            }
            AssertCondition::ConversionCounts {
                user,
                completed,
                failed,
            } => {
                let user_id = &self.user(*user)?.user_id;
                let history = self.service.conversion_history(user_id, 1, usize::MAX);
                let actual_completed = history
                    .items
                    .iter()
                    .filter(|c| c.status == ConversionStatus::Completed)
                    .count();
                let actual_failed = history
                    .items
                    .iter()
                    .filter(|c| c.status == ConversionStatus::Failed)
                    .count();
                anyhow::ensure!(
                    actual_completed == *completed && actual_failed == *failed,
                    "expected {completed} completed / {failed} failed, found {actual_completed} / {actual_failed}"
                );
            }
        }
        Ok(())
    }

    fn last_conversion_status(&self, user_idx: usize) -> anyhow::Result<ConversionStatus> {
        let user_id = &self.user(user_idx)?.user_id;
        self.service
            .conversion_history(user_id, 1, 1)
            .items
            .first()
            .map(|c| c.status)
            .ok_or_else(|| anyhow::anyhow!("user {user_id} has no conversions"))
    }

    fn user(&self, idx: usize) -> anyhow::Result<&SimulatedUser> {
        self.users
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("no simulated user at index {idx}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    async fn run(name: &str) -> SimulationController {
        let mut controller = SimulationController::new(3, fast_config());
        controller.initialize(dec!(1500), dec!(1)).unwrap();
        let scenario = Scenario::load(name).unwrap();
        controller.run_scenario(scenario).await.unwrap();
        controller
    }

    fn fast_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.settlement.backoff_base = Duration::from_millis(5);
        config
    }

    #[tokio::test]
    async fn test_happy_path_scenario() {
        let controller = run("happy-path").await;
        assert_eq!(controller.metrics().completed_conversions, 1);
        assert_eq!(controller.metrics().failed_conversions, 0);
    }

    #[tokio::test]
    async fn test_concurrent_overdraw_scenario() {
        let controller = run("concurrent-overdraw").await;
        assert_eq!(controller.metrics().completed_conversions, 1);
        assert_eq!(controller.metrics().failed_conversions, 1);
    }

    #[tokio::test]
    async fn test_conflict_retry_scenario() {
        let controller = run("conflict-retry").await;
        assert_eq!(controller.metrics().completed_conversions, 1);
    }

    #[tokio::test]
    async fn test_conflict_exhaustion_scenario() {
        let controller = run("conflict-exhaustion").await;
        assert_eq!(controller.metrics().failed_conversions, 1);
    }

    #[tokio::test]
    async fn test_mixed_load_scenario() {
        let controller = run("mixed-load").await;
        assert_eq!(controller.metrics().completed_conversions, 9);
    }

    #[tokio::test]
    async fn test_random_mode_is_reproducible() {
        let mut controller = SimulationController::new(2, fast_config());
        controller.initialize(dec!(1500), dec!(1)).unwrap();
        controller.run_random(10, Some(42)).await.unwrap();
        assert_eq!(controller.metrics().total_conversions, 10);
    }
}
