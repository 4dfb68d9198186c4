//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::app::SchedulerCore;
use crate::config::ServerConfig;
use crate::error::ExecError;
use crate::ports::{FixedClock, ScriptRunner, SequentialIdGenerator};

/// What a [`FakeRunner`] reports for one program.
#[derive(Debug, Clone, Copy)]
pub enum FakeOutcome {
    Exit(i32),
    SpawnFails,
}

#[derive(Debug, Default)]
struct RunState {
    running: HashMap<String, usize>,
    max_running: HashMap<String, usize>,
    max_total: usize,
    calls: Vec<String>,
}

/// In-memory `ScriptRunner`, keyed by the program's file name.
///
/// A gated runner parks every run until [`release`](Self::release) hands out
/// a permit, so tests can hold scripts "in flight".
#[derive(Debug, Default)]
pub struct FakeRunner {
    outcomes: Mutex<HashMap<String, FakeOutcome>>,
    gate: Option<Semaphore>,
    state: Mutex<RunState>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn with_outcome(self, program: &str, outcome: FakeOutcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(program.to_string(), outcome);
        self
    }

    /// Let `n` parked runs finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn running(&self) -> usize {
        self.state.lock().unwrap().running.values().sum()
    }

    pub fn max_running(&self, program: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .max_running
            .get(program)
            .copied()
            .unwrap_or(0)
    }

    pub fn max_total(&self) -> usize {
        self.state.lock().unwrap().max_total
    }
}

#[async_trait]
impl ScriptRunner for FakeRunner {
    async fn run(&self, program: &Path) -> Result<i32, ExecError> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(name.clone());
            let running = state.running.entry(name.clone()).or_insert(0);
            *running += 1;
            let now = *running;
            let max = state.max_running.entry(name.clone()).or_insert(0);
            *max = (*max).max(now);
            let total: usize = state.running.values().sum();
            state.max_total = state.max_total.max(total);
        }

        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }

        {
            let mut state = self.state.lock().unwrap();
            if let Some(running) = state.running.get_mut(&name) {
                *running -= 1;
            }
        }

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&name)
            .copied()
            .unwrap_or(FakeOutcome::Exit(0));
        match outcome {
            FakeOutcome::Exit(code) => Ok(code),
            FakeOutcome::SpawnFails => Err(ExecError::Spawn {
                program: program.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
    ))
}

/// A core on a fixed clock with a zero-length rate-limit window, so tests can
/// submit back to back from one requester.
pub fn core_with(runner: Arc<FakeRunner>, mut config: ServerConfig) -> Arc<SchedulerCore> {
    config.rate_limit_window_ms = 0;
    Arc::new(SchedulerCore::new(
        config,
        fixed_clock(),
        runner,
        Box::new(SequentialIdGenerator::default()),
    ))
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn wait_until<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
