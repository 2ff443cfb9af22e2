//! Integration tests for the vrfgen batch pipeline

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vrfgen_core::{
    curve::{field_from_h256, scalar_canonical, scalar_reduced},
    vrf::scalar_from_curve_points,
    Address, KdfCosts, KeyFile, KeyFileDecryptor, KeyMaterial, PasswordKeyDecryptor, Proof,
    ProofConstruction, Secp256k1, Secp256k1Vrf, H256,
};
use vrfgen_prover::{
    seed::derive_pre_seed, BatchRequest, NonceRange, ProofPipeline, ProverConfig, ProverError,
    RequestContext, SeedScheme, HEADER,
};

const LIGHT_COSTS: KdfCosts = KdfCosts {
    m_cost: 64,
    t_cost: 1,
    p_cost: 1,
};

fn key() -> KeyMaterial {
    KeyMaterial::from_secret_bytes(&[0x5e; 32]).unwrap()
}

fn request(count: u64) -> BatchRequest {
    BatchRequest {
        nonce_count: count,
        ..BatchRequest::new(
            Address::from_hex("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap(),
            42,
            H256::new([0x9b; 32]),
            18_000_000,
        )
    }
}

/// Delegates to the real VRF but refuses one seed, counting every call
struct FailingAt {
    inner: Secp256k1Vrf,
    bad_seed: H256,
    calls: AtomicUsize,
}

impl FailingAt {
    fn new(bad_seed: H256) -> Self {
        Self {
            inner: Secp256k1Vrf::default(),
            bad_seed,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ProofConstruction for FailingAt {
    fn generate_proof(&self, key: &KeyMaterial, seed: &H256) -> vrfgen_core::Result<Proof> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *seed == self.bad_seed {
            return Err(vrfgen_core::Error::ProofConstruction(
                "injected failure".to_string(),
            ));
        }
        self.inner.generate_proof(key, seed)
    }

    fn verify_proof(&self, proof: &Proof) -> vrfgen_core::Result<bool> {
        self.inner.verify_proof(proof)
    }
}

fn final_seed_for(key: &KeyMaterial, context: &RequestContext, nonce: u64) -> H256 {
    let pre = derive_pre_seed(&key.key_hash(), &context.sender, context.subscription_id, nonce).unwrap();
    SeedScheme::FullContext.derive(&pre, context).unwrap().0
}

#[tokio::test]
async fn test_batch_is_complete_for_any_worker_count() {
    let n = 6;
    for workers in [1, 2, 3, 4, 6, 10] {
        let pipeline = ProofPipeline::with_config(ProverConfig {
            workers: Some(workers),
            channel_capacity: 2,
            ..Default::default()
        })
        .unwrap();
        let table = pipeline.run_batch(Arc::new(key()), &request(n)).await.unwrap();

        assert_eq!(table.len() as u64, n, "workers = {}", workers);
        let nonces: Vec<u64> = table.records().iter().map(|r| r.nonce).collect();
        assert_eq!(nonces, (1..=n).collect::<Vec<_>>(), "workers = {}", workers);
    }
}

#[tokio::test]
async fn test_results_do_not_depend_on_worker_count() {
    let single = ProofPipeline::with_config(ProverConfig {
        workers: Some(1),
        ..Default::default()
    })
    .unwrap();
    let many = ProofPipeline::with_config(ProverConfig {
        workers: Some(4),
        ..Default::default()
    })
    .unwrap();

    let a = single.run_batch(Arc::new(key()), &request(5)).await.unwrap();
    let b = many.run_batch(Arc::new(key()), &request(5)).await.unwrap();
    assert_eq!(a.records(), b.records());
    assert_eq!(a.to_json(true).unwrap(), b.to_json(true).unwrap());
}

#[tokio::test]
async fn test_records_are_consistent() {
    let key = key();
    let pipeline = ProofPipeline::with_config(ProverConfig {
        workers: Some(2),
        ..Default::default()
    })
    .unwrap();
    let table = pipeline.run_batch(Arc::new(key.clone()), &request(4)).await.unwrap();

    let vrf = Secp256k1Vrf::default();
    let curve = Secp256k1::new();
    let mut seeds = HashSet::new();
    for record in table.records() {
        assert_eq!(record.key_hash, key.key_hash());
        assert_eq!(record.proof.seed, record.final_seed.0);
        assert_eq!(record.proof.public_key, *key.public_key());
        assert!(vrf.verify_proof(&record.proof).unwrap());
        assert!(seeds.insert(record.final_seed));

        // what an on-chain verifier would recompute from the witnesses
        let w = &record.witness;
        let sum = curve.projective_add(&w.c_gamma_witness, &w.s_hash_witness).unwrap();
        let v = sum.to_affine(&field_from_h256(&w.z_inverse).unwrap()).unwrap();
        let hash = curve.hash_to_curve(&record.proof.public_key, &record.proof.seed).unwrap();
        let c = scalar_from_curve_points(&hash, &record.proof.public_key, &record.proof.gamma, &w.u_witness, &v)
            .unwrap();
        assert_eq!(c, record.proof.c);

        let s = scalar_canonical(&record.proof.s).unwrap();
        assert_eq!(w.s_hash_witness, curve.mul(&s, &hash));
        assert_eq!(
            w.c_gamma_witness,
            curve.mul(&scalar_reduced(&record.proof.c), &record.proof.gamma)
        );
    }
}

#[tokio::test]
async fn test_generate_with_key_file() {
    let key = key();
    let export = PasswordKeyDecryptor
        .encrypt(&key, "correct horse", LIGHT_COSTS, &mut rand::thread_rng())
        .unwrap();

    let pipeline = ProofPipeline::with_config(ProverConfig {
        workers: Some(3),
        ..Default::default()
    })
    .unwrap();
    let table = pipeline
        .generate(&PasswordKeyDecryptor, &export, "correct horse", &request(5))
        .await
        .unwrap();

    let rows: Vec<Vec<String>> = serde_json::from_str(&table.to_json(true).unwrap()).unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0], HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    for (i, row) in rows[1..].iter().enumerate() {
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[3], (i + 1).to_string());
        assert_eq!(row[0], key.key_hash().to_string());
        assert_eq!(row[1], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }
}

/// geth v3 keystore for the secret 0x42..42 under "correct horse battery staple"
const CHAINLINK_EXPORT: &str = r#"{"PublicKey":"0x24653eac434488002cc06bbfb7f10fe18991e35f9fe4302dbea6d2353dc0ab1c01","vrf_key":{"address":"17c5185167401ed00cf5f5b2fc97d9bbfdb7d025","crypto":{"cipher":"aes-128-ctr","ciphertext":"fbf9d76894be51f4bb62f6962c3531413e0d7764e90aadeddea76f7ad5ed0d81","cipherparams":{"iv":"a0a1a2a3a4a5a6a7a8a9aaabacadaeaf"},"kdf":"scrypt","kdfparams":{"dklen":32,"n":4096,"p":1,"r":8,"salt":"000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"},"mac":"b68e5f2ba27974e725a7b7be82e3f421dfbcfbbeb7696137ec2cedbf83a29184"},"version":3}}"#;

#[tokio::test]
async fn test_generate_with_chainlink_key_file() {
    let file = KeyFile::from_json(CHAINLINK_EXPORT.as_bytes()).unwrap();
    let pipeline = ProofPipeline::with_config(ProverConfig {
        workers: Some(2),
        ..Default::default()
    })
    .unwrap();

    let table = pipeline
        .generate(&KeyFileDecryptor, &file, "correct horse battery staple", &request(3))
        .await
        .unwrap();
    assert_eq!(table.len(), 3);
    for record in table.records() {
        assert_eq!(
            record.key_hash.to_string(),
            "0xd885744b9cb252077d755ad317c5185167401ed00cf5f5b2fc97d9bbfdb7d025"
        );
    }

    let err = pipeline
        .generate(&KeyFileDecryptor, &file, "correct horse", &request(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ProverError::Decryption(_)));
}

#[tokio::test]
async fn test_wrong_password_does_no_proof_work() {
    let key = key();
    let export = PasswordKeyDecryptor
        .encrypt(&key, "correct horse", LIGHT_COSTS, &mut rand::thread_rng())
        .unwrap();

    let constructor = Arc::new(FailingAt::new(H256::ZERO));
    let pipeline = ProofPipeline::new(
        ProverConfig::default(),
        Arc::clone(&constructor),
        Secp256k1::new(),
    )
    .unwrap();

    let err = pipeline
        .generate(&PasswordKeyDecryptor, &export, "battery staple", &request(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ProverError::Decryption(_)));
    assert_eq!(constructor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failure_at_one_nonce_fails_the_batch() {
    let key = key();
    let req = request(8);
    let context = req.context().unwrap();
    let constructor = Arc::new(FailingAt::new(final_seed_for(&key, &context, 5)));

    for workers in [1, 3, 8] {
        let pipeline = ProofPipeline::new(
            ProverConfig::default(),
            Arc::clone(&constructor),
            Secp256k1::new(),
        )
        .unwrap();
        let err = pipeline
            .run(Arc::new(key.clone()), context, NonceRange::first(8).unwrap(), workers)
            .await
            .unwrap_err();

        assert_eq!(err.nonce(), Some(5), "workers = {}", workers);
        assert!(
            matches!(err.root(), ProverError::ProofGeneration(msg) if msg.contains("injected failure")),
            "workers = {}: {}",
            workers,
            err
        );
    }
}

#[tokio::test]
async fn test_run_batch_validates_request() {
    let pipeline = ProofPipeline::with_config(ProverConfig::default()).unwrap();

    let mut req = request(3);
    req.num_words = u32::MAX as u64 + 1;
    let err = pipeline.run_batch(Arc::new(key()), &req).await.unwrap_err();
    assert!(matches!(err, ProverError::Encoding(_)));

    let err = pipeline.run_batch(Arc::new(key()), &request(0)).await.unwrap_err();
    assert!(matches!(err, ProverError::InvalidRange { .. }));

    let mut req = request(3);
    req.workers = Some(0);
    let err = pipeline.run_batch(Arc::new(key()), &req).await.unwrap_err();
    assert!(matches!(err, ProverError::InvalidWorkerCount(0)));
}
