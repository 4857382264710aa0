//! Seeded multi-threaded workloads against one shared mock.
//!
//! Each thread draws its operations from its own `ChaCha8Rng`, seeded from
//! the workload seed and the thread number, so a failing run can be
//! replayed. The report tallies what every thread did; the ledger of the
//! mock must account for exactly that.

use std::collections::BTreeMap;

use mimic_core::{
    EventHandler, InteractionKind, Matcher, MethodSetup, Mock, MockError, Value, args,
    prelude::Configure,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::{kind_name, member_name};

/// Method every workload thread calls; its setup cycles through
/// [`SEQUENCE_LEN`] values.
pub const SEQUENCE_METHOD: &str = "Next";

/// Length of the return sequence of [`SEQUENCE_METHOD`].
pub const SEQUENCE_LEN: usize = 3;

/// Workload parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Base seed
    pub seed: u64,
    /// Number of threads
    pub threads: usize,
    /// Operations per thread
    pub ops_per_thread: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { seed: 0, threads: 4, ops_per_thread: 250 }
    }
}

/// What a workload did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadReport {
    /// Interactions performed per kind name
    pub kinds: BTreeMap<String, usize>,
    /// How often each value of the [`SEQUENCE_METHOD`] sequence was returned
    pub sequence_hits: [usize; SEQUENCE_LEN],
    /// Calls that returned an error
    pub errors: usize,
}

impl WorkloadReport {
    /// Total interactions performed.
    pub fn total(&self) -> usize {
        self.kinds.values().sum()
    }

    fn count(&mut self, kind: InteractionKind) {
        *self.kinds.entry(kind_name(kind).to_string()).or_default() += 1;
    }

    fn merge(&mut self, other: &Self) {
        for (kind, count) in &other.kinds {
            *self.kinds.entry(kind.clone()).or_default() += count;
        }
        for (total, hits) in self.sequence_hits.iter_mut().zip(other.sequence_hits) {
            *total += hits;
        }
        self.errors += other.errors;
    }
}

/// Seeded concurrent driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Workload {
    config: WorkloadConfig,
}

impl Workload {
    /// Create a workload.
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    /// Register the setups the workload relies on.
    pub fn prepare(mock: &Mock) {
        let mut setup = MethodSetup::builder(SEQUENCE_METHOD);
        for value in 0..SEQUENCE_LEN {
            setup = setup.returns(value);
        }
        mock.setup_method(setup);
        mock.setup_method(MethodSetup::builder("Echo").args([Matcher::any::<u32>()]).returns_with(
            |args| args.first().and_then(Value::cast::<u32>).unwrap_or_default(),
        ));
    }

    /// Run every thread to completion against `mock` and merge the tallies.
    pub fn run(&self, mock: &Mock) -> WorkloadReport {
        let reports: Vec<WorkloadReport> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..self.config.threads)
                .map(|thread| s.spawn(move || self.run_thread(mock, thread)))
                .collect();
            handles.into_iter().filter_map(|h| h.join().ok()).collect()
        });

        let mut report = WorkloadReport::default();
        for thread_report in &reports {
            report.merge(thread_report);
        }

        tracing::info!(
            seed = self.config.seed,
            threads = self.config.threads,
            total = report.total(),
            errors = report.errors,
            "workload finished"
        );
        report
    }

    fn run_thread(&self, mock: &Mock, thread: usize) -> WorkloadReport {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ (thread as u64).rotate_left(32));
        let handler = EventHandler::new(|_| {});
        let mut report = WorkloadReport::default();

        for _ in 0..self.config.ops_per_thread {
            let member = member_name(rng.r#gen());
            let outcome = match rng.gen_range(0..8) {
                0 => {
                    report.count(InteractionKind::Method);
                    mock.invoke_method::<usize>(SEQUENCE_METHOD, args![]).map(|value| {
                        if let Some(hits) = report.sequence_hits.get_mut(value) {
                            *hits += 1;
                        }
                    })
                },
                1 => {
                    report.count(InteractionKind::Method);
                    let arg: u32 = rng.r#gen();
                    mock.invoke_method::<u32>("Echo", args![arg]).map(|_| ())
                },
                2 => {
                    report.count(InteractionKind::PropertySet);
                    mock.set_property(&member, Value::new(rng.r#gen::<i32>())).map(|_| ())
                },
                3 => {
                    report.count(InteractionKind::PropertyGet);
                    mock.get_property::<i32>(&member).map(|_| ())
                },
                4 => {
                    report.count(InteractionKind::IndexerSet);
                    let key: u8 = rng.gen_range(0..16);
                    mock.set_indexer(Value::new(rng.r#gen::<i32>()), args![key]).map(|_| ())
                },
                5 => {
                    report.count(InteractionKind::IndexerGet);
                    let key: u8 = rng.gen_range(0..16);
                    mock.get_indexer::<i32>(args![key]).map(|_| ())
                },
                6 => {
                    report.count(InteractionKind::EventSubscribe);
                    mock.add_event(&member, Some(Value::new(thread)), handler.clone());
                    Ok::<(), MockError>(())
                },
                _ => {
                    report.count(InteractionKind::EventUnsubscribe);
                    mock.remove_event(&member, Some(Value::new(thread)), handler.clone());
                    Ok(())
                },
            };

            if let Err(err) = outcome {
                tracing::debug!(thread, %err, "workload operation failed");
                report.errors += 1;
            }
        }
        report
    }
}
