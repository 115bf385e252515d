//! Stock-selection endpoints

use std::time::Duration;

use tracing::{info, warn};

use super::types::{ConceptsResponse, SelectRequest, SelectResponse, Strategy, StrategyResults};
use super::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    /// Run one selection strategy.
    pub async fn select(
        &self,
        strategy: Strategy,
        request: &SelectRequest,
    ) -> Result<SelectResponse, ClientError> {
        info!(
            "running {} selection (preset {}, limit {})",
            strategy, request.preset, request.limit
        );
        self.execute(self.post(strategy.endpoint()).json(request))
            .await
    }

    /// Run every strategy in sequence with the same parameters, pausing
    /// between runs so the backend scripts are not launched concurrently.
    ///
    /// One failed strategy does not stop the remaining ones.
    pub async fn run_all_strategies(
        &self,
        request: &SelectRequest,
        pause: Duration,
    ) -> Vec<(Strategy, Result<SelectResponse, ClientError>)> {
        let mut results = Vec::with_capacity(Strategy::ALL.len());
        for (i, strategy) in Strategy::ALL.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(pause).await;
            }
            let result = self.select(strategy, request).await;
            if let Err(e) = &result {
                warn!("{strategy} selection failed: {e}");
            }
            results.push((strategy, result));
        }
        results
    }

    /// Current top-N concept ranking.
    pub async fn top_concepts(&self, n: u32) -> Result<ConceptsResponse, ClientError> {
        self.execute(self.get("/stock/top-concepts").query(&[("n", n)]))
            .await
    }

    /// Per-strategy results stored by earlier runs.
    pub async fn strategy_results(&self) -> Result<StrategyResults, ClientError> {
        self.execute(self.get("/stock/strategy-results")).await
    }
}
