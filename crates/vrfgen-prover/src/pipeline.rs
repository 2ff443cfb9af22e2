//! Parallel batch proving
//!
//! A nonce range is partitioned across blocking worker tasks. Each worker
//! walks its sub-range in order, derives seeds, builds the proof and its
//! witnesses, and hands the finished record to the merge step over a bounded
//! channel. The batch finishes when every worker has returned and the channel
//! has closed; the first failure cancels the remaining workers and no partial
//! output is returned.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vrfgen_core::{KeyDecryptor, KeyMaterial, ProofConstruction, Secp256k1, Secp256k1Vrf, H256};

use crate::config::ProverConfig;
use crate::error::{ProverError, Result};
use crate::partition::{partition, NonceRange};
use crate::proof::ProofGenerator;
use crate::record::{RecordTable, ResultRecord};
use crate::request::BatchRequest;
use crate::seed::{derive_pre_seed, RequestContext, SeedScheme};
use crate::witness::precompute;

/// Shared stop signal plus the failure that raised it
#[derive(Default)]
struct CancelToken {
    cancelled: AtomicBool,
    first_error: Mutex<Option<ProverError>>,
}

impl CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Record `err` unless an earlier failure is already held, then cancel
    fn fail(&self, err: ProverError) {
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
        self.cancelled.store(true, Ordering::Release);
    }

    fn take_error(&self) -> Option<ProverError> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerOutcome {
    Completed(u64),
    Cancelled,
    Failed,
}

/// State one worker needs; everything is shared read-only except its sender
struct Worker<P: ProofConstruction> {
    id: usize,
    key: Arc<KeyMaterial>,
    key_hash: H256,
    context: RequestContext,
    scheme: SeedScheme,
    generator: ProofGenerator<P>,
    curve: Secp256k1,
    token: Arc<CancelToken>,
    tx: mpsc::Sender<ResultRecord>,
}

impl<P: ProofConstruction> Worker<P> {
    fn prove_range(self, range: NonceRange) -> WorkerOutcome {
        let mut produced = 0u64;
        for nonce in range.iter() {
            if self.token.is_cancelled() {
                return WorkerOutcome::Cancelled;
            }
            let record = match self.prove_nonce(nonce) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Worker {} failed at nonce {}: {}", self.id, nonce, e);
                    self.token.fail(e.at_nonce(nonce));
                    return WorkerOutcome::Failed;
                }
            };
            if self.tx.blocking_send(record).is_err() {
                // receiver gone: the batch has already been abandoned
                return WorkerOutcome::Cancelled;
            }
            produced += 1;
        }
        WorkerOutcome::Completed(produced)
    }

    fn prove_nonce(&self, nonce: u64) -> Result<ResultRecord> {
        let pre_seed = derive_pre_seed(
            &self.key_hash,
            &self.context.sender,
            self.context.subscription_id,
            nonce,
        )?;
        let final_seed = self.scheme.derive(&pre_seed, &self.context)?;
        let proof = self.generator.generate(&self.key, &final_seed)?;
        let witness = precompute(&self.curve, &proof)?;
        Ok(ResultRecord {
            key_hash: self.key_hash,
            nonce,
            context: self.context,
            pre_seed,
            final_seed,
            proof,
            witness,
        })
    }
}

/// Orchestrates batch proving over a proof constructor
pub struct ProofPipeline<P: ProofConstruction> {
    config: ProverConfig,
    generator: ProofGenerator<P>,
    curve: Secp256k1,
}

impl ProofPipeline<Secp256k1Vrf> {
    /// Pipeline over the secp256k1 VRF
    pub fn with_config(config: ProverConfig) -> Result<Self> {
        let curve = Secp256k1::new();
        Self::new(config, Arc::new(Secp256k1Vrf::new(curve)), curve)
    }
}

impl<P: ProofConstruction + 'static> ProofPipeline<P> {
    pub fn new(config: ProverConfig, constructor: Arc<P>, curve: Secp256k1) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            generator: ProofGenerator::new(constructor),
            curve,
        })
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    /// Prove every nonce in `range` using `workers` worker tasks.
    ///
    /// Records come back ordered by nonce. Any stage failure aborts the batch
    /// with the failing nonce attached.
    pub async fn run(
        &self,
        key: Arc<KeyMaterial>,
        context: RequestContext,
        range: NonceRange,
        workers: usize,
    ) -> Result<Vec<ResultRecord>> {
        let ranges = partition(range.start, range.end, workers)?;
        let expected = range.len();
        info!(
            "Generating {} proofs for nonces {}..={} across {} workers",
            expected,
            range.start,
            range.end,
            ranges.len()
        );

        let key_hash = key.key_hash();
        let token = Arc::new(CancelToken::default());
        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity);
        let mut tasks = JoinSet::new();

        for (id, sub_range) in ranges.into_iter().enumerate() {
            debug!("Worker {} assigned nonces {}..={}", id, sub_range.start, sub_range.end);
            let worker = Worker {
                id,
                key: Arc::clone(&key),
                key_hash,
                context,
                scheme: self.config.seed_scheme,
                generator: self.generator.clone(),
                curve: self.curve,
                token: Arc::clone(&token),
                tx: tx.clone(),
            };
            tasks.spawn_blocking(move || (id, worker.prove_range(sub_range)));
        }
        // the channel closes once the last worker drops its sender
        drop(tx);

        let mut merged: BTreeMap<u64, ResultRecord> = BTreeMap::new();
        while let Some(record) = rx.recv().await {
            if token.is_cancelled() {
                continue;
            }
            let nonce = record.nonce;
            if merged.insert(nonce, record).is_some() {
                token.fail(ProverError::DuplicateNonce(nonce));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, WorkerOutcome::Completed(produced))) => {
                    debug!("Worker {} finished {} nonces", id, produced);
                }
                Ok((id, WorkerOutcome::Cancelled)) => {
                    warn!("Worker {} cancelled", id);
                }
                Ok((_, WorkerOutcome::Failed)) => {}
                Err(e) => {
                    warn!("Worker task failed: {}", e);
                    token.fail(ProverError::Worker(e.to_string()));
                }
            }
        }

        if let Some(err) = token.take_error() {
            warn!("Batch aborted: {}", err);
            return Err(err);
        }

        let actual = merged.len() as u64;
        if actual != expected {
            return Err(ProverError::Incomplete { expected, actual });
        }

        info!("Generated {} proofs", actual);
        Ok(merged.into_values().collect())
    }

    /// Prove nonces `1..=nonce_count` for `request` and tabulate the results
    pub async fn run_batch(&self, key: Arc<KeyMaterial>, request: &BatchRequest) -> Result<RecordTable> {
        let context = request.context()?;
        let range = request.nonce_range()?;
        let workers = self.config.effective_workers(request.workers)?;
        let records = self.run(key, context, range, workers).await?;
        RecordTable::from_records(records)
    }

    /// Open the key export and run the batch. Nothing is proved unless the
    /// key decrypts.
    pub async fn generate<D: KeyDecryptor + ?Sized>(
        &self,
        decryptor: &D,
        export: &D::Export,
        password: &str,
        request: &BatchRequest,
    ) -> Result<RecordTable> {
        let key = decryptor.decrypt(export, password)?;
        info!("Unlocked key {}", key.key_hash().short());
        self.run_batch(Arc::new(key), request).await
    }
}
