//! Per-nonce results and their tabular rendering

use vrfgen_core::{curve::long_marshal, AffinePoint, Proof, H256};

use crate::error::{ProverError, Result};
use crate::seed::{FinalSeed, PreSeed, RequestContext};
use crate::witness::SolidityWitness;

/// Column names, in row order
pub const HEADER: [&str; 20] = [
    "keyHash",
    "senderAddress",
    "subscriptionId",
    "nonce",
    "preSeed",
    "blockHash",
    "blockNumber",
    "callbackGasLimit",
    "numWords",
    "finalSeed",
    "proofPublicKey",
    "proofGamma",
    "proofC",
    "proofS",
    "proofSeed",
    "randomOutput",
    "uWitness",
    "cGammaWitness",
    "sHashWitness",
    "zInverse",
];

/// Everything produced for one nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub key_hash: H256,
    pub nonce: u64,
    pub context: RequestContext,
    pub pre_seed: PreSeed,
    pub final_seed: FinalSeed,
    pub proof: Proof,
    pub witness: SolidityWitness,
}

impl ResultRecord {
    /// Render as strings in [`HEADER`] order
    pub fn to_row(&self) -> Result<Vec<String>> {
        Ok(vec![
            self.key_hash.to_string(),
            self.context.sender.to_checksum(),
            self.context.subscription_id.to_string(),
            self.nonce.to_string(),
            self.pre_seed.to_string(),
            self.context.block_hash.to_string(),
            self.context.block_number.to_string(),
            self.context.callback_gas_limit.to_string(),
            self.context.num_words.to_string(),
            self.final_seed.to_string(),
            point_hex(&self.proof.public_key)?,
            point_hex(&self.proof.gamma)?,
            self.proof.c.to_string(),
            self.proof.s.to_string(),
            self.proof.seed.to_string(),
            self.proof.output.to_string(),
            self.witness.u_witness.to_checksum(),
            point_hex(&self.witness.c_gamma_witness)?,
            point_hex(&self.witness.s_hash_witness)?,
            self.witness.z_inverse.to_string(),
        ])
    }
}

/// `0x` followed by the 128 hex digits of `x || y`
pub fn point_hex(point: &AffinePoint) -> Result<String> {
    Ok(format!("0x{}", hex::encode(long_marshal(point)?)))
}

/// Records for a batch, ordered by nonce, with their rendered rows
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: Vec<ResultRecord>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records already in nonce order
    pub fn from_records(records: Vec<ResultRecord>) -> Result<Self> {
        let mut table = Self {
            records: Vec::with_capacity(records.len()),
            rows: Vec::with_capacity(records.len()),
        };
        for record in records {
            table.push(record)?;
        }
        Ok(table)
    }

    /// Append a record; its row must match the header width
    pub fn push(&mut self, record: ResultRecord) -> Result<()> {
        let row = record.to_row()?;
        self.push_row(row)?;
        self.records.push(record);
        Ok(())
    }

    fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != HEADER.len() {
            return Err(ProverError::RecordShape {
                expected: HEADER.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header() -> Vec<String> {
        HEADER.iter().map(|h| h.to_string()).collect()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// JSON array of string arrays, optionally led by the header row
    pub fn to_json(&self, include_header: bool) -> Result<String> {
        let mut out: Vec<Vec<String>> = Vec::with_capacity(self.rows.len() + 1);
        if include_header {
            out.push(Self::header());
        }
        out.extend(self.rows.iter().cloned());
        Ok(serde_json::to_string(&out)?)
    }
}
