//! Fan-out / fan-in aggregation
//!
//! Runs a fixed set of independent computations concurrently and joins all of
//! them. A failing branch never cancels its siblings: its error is collected
//! and every successful branch keeps its data in its own section.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::hash::Hash;

use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

// == Branch Error ==
/// Failure of one named branch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{branch}: {message}")]
pub struct BranchError {
    pub branch: String,
    pub message: String,
}

type BranchFuture<K, V> = BoxFuture<'static, Result<HashMap<K, V>, String>>;

// == Fan Out ==
/// Builder collecting the branches to run.
pub struct FanOut<K, V> {
    branches: Vec<(String, BranchFuture<K, V>)>,
}

impl<K, V> Default for FanOut<K, V> {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
        }
    }
}

impl<K, V> FanOut<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a branch. Nothing runs until [`run`](Self::run) is called.
    pub fn branch<F, E>(mut self, name: impl Into<String>, computation: F) -> Self
    where
        F: Future<Output = Result<HashMap<K, V>, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let future = async move { computation.await.map_err(|err| err.to_string()) };
        self.branches.push((name.into(), Box::pin(future)));
        self
    }

    /// Spawns every branch at once and waits for all of them.
    ///
    /// Errors are reported in the order the branches were declared. A branch
    /// that panics is reported as a failed branch.
    pub async fn run(self) -> Aggregate<K, V> {
        let (names, computations): (Vec<_>, Vec<_>) = self.branches.into_iter().unzip();
        let handles = computations.into_iter().map(tokio::spawn);
        let joined = join_all(handles).await;

        let mut aggregate = Aggregate::default();
        for (branch, outcome) in names.into_iter().zip(joined) {
            let message = match outcome {
                Ok(Ok(data)) => {
                    aggregate.data.insert(branch, data);
                    continue;
                }
                Ok(Err(message)) => message,
                Err(join_error) => format!("branch did not complete: {}", join_error),
            };
            warn!(branch = %branch, error = %message, "Aggregate branch failed");
            aggregate.errors.push(BranchError { branch, message });
        }
        aggregate
    }
}

// == Aggregate ==
/// Combined result: successful branches by name, plus every branch error.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate<K, V> {
    pub data: BTreeMap<String, HashMap<K, V>>,
    pub errors: Vec<BranchError>,
}

impl<K, V> Default for Aggregate<K, V> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: Vec::new(),
        }
    }
}

impl<K, V> Aggregate<K, V> {
    /// True when no branch failed.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn branch(&self, name: &str) -> Option<&HashMap<K, V>> {
        self.data.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn data(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_one_failing_branch_keeps_the_others() {
        let stocks = data(&[("AAPL", 120.0), ("MSFT", -4.5)]);
        let gold = data(&[("bar", 310.0)]);
        let expected_stocks = stocks.clone();
        let expected_gold = gold.clone();

        let aggregate = FanOut::new()
            .branch("stocks", async move { Ok::<_, String>(stocks) })
            .branch("savings", async {
                Err::<HashMap<String, f32>, _>("missing required fields in asset")
            })
            .branch("gold", async move { Ok::<_, String>(gold) })
            .run()
            .await;

        assert!(!aggregate.is_complete());
        assert_eq!(aggregate.errors.len(), 1);
        assert_eq!(aggregate.errors[0].branch, "savings");
        assert_eq!(aggregate.branch("stocks"), Some(&expected_stocks));
        assert_eq!(aggregate.branch("gold"), Some(&expected_gold));
        assert!(aggregate.branch("savings").is_none());
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        // "waiter" can only finish if "signaller" runs while it is waiting.
        let aggregate = FanOut::new()
            .branch("waiter", async move {
                rx.await.map_err(|e| e.to_string())?;
                Ok::<_, String>(data(&[("a", 1.0)]))
            })
            .branch("signaller", async move {
                let _ = tx.send(());
                Ok::<_, String>(data(&[("b", 2.0)]))
            })
            .run()
            .await;

        assert!(aggregate.is_complete());
        assert_eq!(aggregate.data.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_cancel_slow_sibling() {
        let aggregate = FanOut::new()
            .branch("fast_fail", async { Err::<HashMap<String, f32>, _>("boom") })
            .branch("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, String>(data(&[("late", 9.0)]))
            })
            .run()
            .await;

        assert_eq!(aggregate.errors.len(), 1);
        assert_eq!(aggregate.branch("slow").unwrap()["late"], 9.0);
    }

    #[tokio::test]
    async fn test_errors_follow_declaration_order() {
        let aggregate: Aggregate<String, f32> = FanOut::new()
            .branch("first", async { Err::<HashMap<String, f32>, _>("one") })
            .branch("second", async { Err::<HashMap<String, f32>, _>("two") })
            .branch("third", async { Err::<HashMap<String, f32>, _>("three") })
            .run()
            .await;

        let branches: Vec<_> = aggregate.errors.iter().map(|e| e.branch.as_str()).collect();
        assert_eq!(branches, vec!["first", "second", "third"]);
        assert_eq!(aggregate.errors[1].to_string(), "second: two");
    }

    #[tokio::test]
    async fn test_panicking_branch_is_reported() {
        let aggregate = FanOut::new()
            .branch("panics", async {
                if true {
                    panic!("division by zero");
                }
                Ok::<HashMap<String, f32>, String>(HashMap::new())
            })
            .branch("fine", async { Ok::<_, String>(data(&[("x", 1.0)])) })
            .run()
            .await;

        assert_eq!(aggregate.errors.len(), 1);
        assert_eq!(aggregate.errors[0].branch, "panics");
        assert!(aggregate.branch("fine").is_some());
    }

    #[tokio::test]
    async fn test_empty_fan_out_is_complete() {
        let aggregate: Aggregate<String, f32> = FanOut::new().run().await;
        assert!(aggregate.is_complete());
        assert!(aggregate.data.is_empty());
    }

    #[test]
    fn test_aggregate_serializes_namespaced() {
        let mut aggregate: Aggregate<String, f32> = Aggregate::default();
        aggregate.data.insert("gold".into(), data(&[("bar", 1.5)]));
        aggregate.errors.push(BranchError {
            branch: "stocks".into(),
            message: "stock prices not found in cache".into(),
        });

        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["data"]["gold"]["bar"], 1.5);
        assert_eq!(json["errors"][0]["branch"], "stocks");
    }
}
