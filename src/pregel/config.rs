//! Run configuration of the BSP engine, loadable from JSON.

use serde::{Deserialize, Serialize};

use super::error::PregelError;
use crate::concurrency::{Concurrency, WorkerPool};

/// How the node id space is split into per-superstep tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partitioning {
    /// Equal-sized id ranges.
    Range,
    /// Ranges of roughly equal total out-degree.
    Degree,
    /// `Degree` if the graph has relationships, `Range` otherwise.
    #[default]
    Auto,
}

/// Configuration of one [`Pregel`](super::Pregel) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregelConfig {
    /// Upper bound on supersteps. Must be at least 1.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Maximum number of partition tasks in flight.
    #[serde(default)]
    pub concurrency: Concurrency,
    /// Smallest partition, in nodes for range partitioning and in degree for degree
    /// partitioning. Must be at least 1.
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: u64,
    /// Partitioning strategy.
    #[serde(default)]
    pub partitioning: Partitioning,
}

fn default_max_iterations() -> u32 {
    20
}

fn default_min_batch_size() -> u64 {
    10_000
}

impl Default for PregelConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            concurrency: Concurrency::default(),
            min_batch_size: default_min_batch_size(),
            partitioning: Partitioning::default(),
        }
    }
}

impl PregelConfig {
    /// Sets [`max_iterations`](Self::max_iterations).
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets [`concurrency`](Self::concurrency).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets [`min_batch_size`](Self::min_batch_size).
    #[must_use]
    pub fn with_min_batch_size(mut self, min_batch_size: u64) -> Self {
        self.min_batch_size = min_batch_size;
        self
    }

    /// Sets [`partitioning`](Self::partitioning).
    #[must_use]
    pub fn with_partitioning(mut self, partitioning: Partitioning) -> Self {
        self.partitioning = partitioning;
        self
    }

    /// Parses and validates a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// Fails on malformed JSON or if [`validate`](Self::validate) rejects the values.
    pub fn from_json_str(json: &str) -> Result<Self, PregelError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`PregelError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), PregelError> {
        if self.max_iterations == 0 {
            return Err(PregelError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.min_batch_size == 0 {
            return Err(PregelError::InvalidConfig(
                "min_batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Builds a [`WorkerPool`] with one thread per unit of
    /// [`concurrency`](Self::concurrency).
    ///
    /// # Errors
    /// Returns [`PregelError::Pool`] if the threads cannot be spawned.
    pub fn worker_pool(&self) -> Result<WorkerPool, PregelError> {
        Ok(WorkerPool::new(self.concurrency.get())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_defaults() {
        let config = PregelConfig::from_json_str(r#"{"max_iterations": 5, "partitioning": "range"}"#)
            .unwrap();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.partitioning, Partitioning::Range);
        assert_eq!(config.min_batch_size, 10_000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PregelConfig::from_json_str(r#"{"max_iterations": 0}"#),
            Err(PregelError::InvalidConfig(_))
        ));
        assert!(matches!(
            PregelConfig::from_json_str(r#"{"concurrency": 0}"#),
            Err(PregelError::Config(_))
        ));
        assert!(matches!(
            PregelConfig::from_json_str("{"),
            Err(PregelError::Config(_))
        ));
    }

    #[test]
    fn builder_round_trips_through_json() {
        let config = PregelConfig::default()
            .with_max_iterations(3)
            .with_concurrency(Concurrency::SINGLE)
            .with_partitioning(Partitioning::Degree);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PregelConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn worker_pool_matches_concurrency() {
        let config = PregelConfig::default().with_concurrency(Concurrency::new(3).unwrap());
        assert_eq!(config.worker_pool().unwrap().threads(), 3);
    }
}
