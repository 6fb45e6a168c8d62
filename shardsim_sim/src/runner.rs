//! Simulation runner - drives every execution group to the end of a run.
//!
//! Each group is a tokio task ticking its own `Network`. All groups share a
//! `MemoryTransport` and meet at a barrier every `sync_time` ticks, so no
//! group drifts more than one sync window ahead of the others. At the end the
//! node summaries are gathered at the root group.

use crate::error::SimError;
use crate::stats::ChainStats;
use shardsim_core::{ConfigError, Message, Network, NodeSummary, SimConfig, Topology};
use shardsim_env::{MemoryRendezvous, MemoryTransport, Rendezvous};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type SimNetwork = Network<MemoryTransport<Message>>;

/// Everything a finished run leaves behind.
pub struct SimOutcome {
    /// One network per group, ordered by group index
    pub networks: Vec<SimNetwork>,

    /// Summaries gathered at the root, ordered by node id
    pub summaries: Vec<NodeSummary>,

    pub stats: ChainStats,
    pub elapsed: Duration,
}

/// Runs a configured simulation over one or more execution groups.
pub struct SimRunner {
    config: SimConfig,
    groups: u32,
}

impl SimRunner {
    /// Creates a runner for `groups` execution groups.
    pub fn new(config: SimConfig, groups: u32) -> Self {
        Self { config, groups }
    }

    /// Sets the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.config.sim_ticks = ticks;
        self
    }

    /// Sets the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Runs the simulation to completion.
    pub async fn run(&self) -> Result<SimOutcome, SimError> {
        self.config.validate()?;
        if self.groups == 0 {
            return Err(ConfigError::TooSmall {
                field: "groups",
                min: 1,
                value: 0,
            }
            .into());
        }

        let config = Arc::new(self.config.clone());
        let everyone = Topology::new(0, self.groups).all_nodes(&config);
        let transport = Arc::new(MemoryTransport::with_nodes(config.inbox_capacity, everyone));
        let rendezvous = Arc::new(MemoryRendezvous::<Vec<NodeSummary>>::new(self.groups));

        info!(
            sim_id = %config.sim_id,
            seed = config.seed,
            groups = self.groups,
            nodes = u64::from(self.groups) * u64::from(config.nodes_per_group),
            ticks = config.sim_ticks,
            "Starting simulation"
        );
        let start = Instant::now();

        let tasks: Vec<_> = (0..self.groups)
            .map(|group| {
                let topology = Topology::new(group, self.groups);
                tokio::spawn(run_group(
                    Arc::clone(&config),
                    topology,
                    Arc::clone(&transport),
                    Arc::clone(&rendezvous),
                ))
            })
            .collect();

        let mut networks = Vec::with_capacity(tasks.len());
        let mut gathered = None;
        for (network, values) in join_groups(tasks).await? {
            if values.is_some() {
                gathered = values;
            }
            networks.push(network);
        }

        let elapsed = start.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Run wall time");

        let mut summaries: Vec<NodeSummary> = gathered
            .ok_or_else(|| {
                shardsim_env::EnvError::RendezvousError("root gathered no summaries".to_string())
            })?
            .into_iter()
            .flatten()
            .collect();
        summaries.sort_by_key(|s| s.id);
        let stats = ChainStats::from_summaries(&summaries);

        info!(
            blocks_mined = stats.blocks_mined,
            beacon_proposed = stats.beacon_proposed,
            head_spread = stats.head_spread,
            lost_sends = stats.lost_sends,
            "Simulation finished"
        );

        Ok(SimOutcome {
            networks,
            summaries,
            stats,
            elapsed,
        })
    }
}

type GroupResult = Result<(SimNetwork, Option<Vec<Vec<NodeSummary>>>), shardsim_env::EnvError>;

async fn run_group(
    config: Arc<SimConfig>,
    topology: Topology,
    transport: Arc<MemoryTransport<Message>>,
    rendezvous: Arc<MemoryRendezvous<Vec<NodeSummary>>>,
) -> GroupResult {
    let mut network = Network::bootstrap(Arc::clone(&config), topology, transport);
    rendezvous.barrier().await;

    for tick in 1..=config.sim_ticks {
        network.tick();
        if tick % config.sync_time == 0 {
            debug!(group = topology.group, tick, "Sync barrier");
            rendezvous.barrier().await;
        }
    }
    rendezvous.barrier().await;

    let gathered = rendezvous.gather(topology.group, network.summaries()).await?;
    Ok((network, gathered))
}

/// Awaits the group tasks in order. On the first failure every task not yet
/// joined is aborted, so no group is left parked at a barrier.
async fn join_groups<R, E>(tasks: Vec<JoinHandle<Result<R, E>>>) -> Result<Vec<R>, SimError>
where
    SimError: From<E>,
{
    let mut results = Vec::with_capacity(tasks.len());
    let mut pending = tasks.into_iter();
    while let Some(task) = pending.next() {
        let joined = match task.await {
            Ok(result) => result.map_err(SimError::from),
            Err(e) => Err(<SimError as From<tokio::task::JoinError>>::from(e)),
        };
        match joined {
            Ok(value) => results.push(value),
            Err(err) => {
                let aborted = pending.len();
                for rest in pending.by_ref() {
                    rest.abort();
                }
                warn!(error = %err, aborted, "Group failed, aborting the rest");
                return Err(err);
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardsim_env::EnvError;

    #[tokio::test]
    async fn test_rejects_zero_groups() {
        let runner = SimRunner::new(SimConfig::default(), 0);
        assert!(matches!(runner.run().await, Err(SimError::Config(_))));
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = SimConfig {
            sync_time: 0,
            ..SimConfig::default()
        };
        assert!(SimRunner::new(config, 1).run().await.is_err());
    }

    #[tokio::test]
    async fn test_single_group_run() {
        let config = SimConfig {
            nodes_per_group: 4,
            ..SimConfig::default()
        };
        let outcome = SimRunner::new(config, 1).with_ticks(30).run().await.unwrap();

        assert_eq!(outcome.networks.len(), 1);
        assert_eq!(outcome.networks[0].time(), 30);
        assert_eq!(outcome.summaries.len(), 4);
        assert_eq!(outcome.stats.nodes, 4);
    }

    #[tokio::test]
    async fn test_failed_group_aborts_the_rest() {
        let held = Arc::new(());
        let parked = Arc::clone(&held);

        let tasks: Vec<JoinHandle<Result<u32, EnvError>>> = vec![
            tokio::spawn(async { Err(EnvError::RendezvousError("boom".to_string())) }),
            tokio::spawn(async move {
                let _parked = parked;
                std::future::pending::<()>().await;
                Ok(1)
            }),
        ];

        let result = join_groups(tasks).await;
        assert!(matches!(result, Err(SimError::Env(_))));

        // The aborted task drops its clone once the runtime reaps it.
        tokio::time::timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&held) > 1 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_join_groups_keeps_order() {
        let tasks: Vec<JoinHandle<Result<u32, EnvError>>> =
            (0..3).map(|i| tokio::spawn(async move { Ok(i) })).collect();
        assert_eq!(join_groups(tasks).await.unwrap(), vec![0, 1, 2]);
    }
}
