//! Blocking wait for the store to report healthy.
//!
//! [`ReadinessGate`] polls a [`HealthProbe`] at a fixed interval, up to a fixed
//! number of attempts. Waiting goes through a [`Sleeper`] so tests run without
//! wall-clock delay, and every wait can be cut short by a cancellation future.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ReadinessConfig;
use crate::ReadinessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready,
    /// The store answered with a non-2xx status.
    NotReady(u16),
    /// The request never got a response.
    Unreachable(String),
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Ready => f.write_str("ready"),
            ProbeOutcome::NotReady(status) => write!(f, "status {status}"),
            ProbeOutcome::Unreachable(reason) => write!(f, "unreachable: {reason}"),
        }
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct ReadinessGate<S = TokioSleeper> {
    max_attempts: u32,
    interval: Duration,
    sleeper: S,
}

impl ReadinessGate<TokioSleeper> {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self::with_sleeper(max_attempts, interval, TokioSleeper)
    }

    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(config.max_attempts, config.interval())
    }
}

impl<S: Sleeper> ReadinessGate<S> {
    pub fn with_sleeper(max_attempts: u32, interval: Duration, sleeper: S) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            sleeper,
        }
    }

    /// Upper bound on time spent sleeping between probes.
    pub fn worst_case_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }

    pub async fn await_ready<P>(&self, probe: &P) -> Result<(), ReadinessError>
    where
        P: HealthProbe + ?Sized,
    {
        self.await_ready_or_cancel(probe, std::future::pending::<()>())
            .await
    }

    /// Like [`await_ready`](Self::await_ready), but gives up as soon as `cancel` resolves.
    pub async fn await_ready_or_cancel<P, C>(
        &self,
        probe: &P,
        cancel: C,
    ) -> Result<(), ReadinessError>
    where
        P: HealthProbe + ?Sized,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut last_outcome = ProbeOutcome::Unreachable("not probed".to_string());

        for attempt in 1..=self.max_attempts {
            let outcome = tokio::select! {
                biased;
                _ = &mut cancel => return Err(ReadinessError::Cancelled { attempts: attempt - 1 }),
                outcome = probe.probe() => outcome,
            };

            if outcome == ProbeOutcome::Ready {
                info!(attempt, "store is ready");
                return Ok(());
            }

            warn!(
                attempt,
                max_attempts = self.max_attempts,
                outcome = %outcome,
                "waiting for store to become ready"
            );
            last_outcome = outcome;

            if attempt < self.max_attempts {
                tokio::select! {
                    biased;
                    _ = &mut cancel => return Err(ReadinessError::Cancelled { attempts: attempt }),
                    _ = self.sleeper.sleep(self.interval) => {}
                }
            }
        }

        Err(ReadinessError::DependencyUnavailable {
            attempts: self.max_attempts,
            last_outcome,
        })
    }
}
