//! Shared test utilities for dagfs integration tests
#![allow(dead_code)]

use std::sync::Arc;

use dagfs_sdk::{
    CoreApi, CoreConfig, InMemoryDagStore, InMemoryNameStore, InMemoryPinStore, UnixfsNode,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An API over in-memory backends, with the backends kept for inspection.
pub struct TestNode {
    pub store: Arc<InMemoryDagStore>,
    pub names: Arc<InMemoryNameStore>,
    pub pins: Arc<InMemoryPinStore>,
    pub api: CoreApi,
}

pub fn setup() -> TestNode {
    setup_with(CoreConfig::default())
}

pub fn setup_with(config: CoreConfig) -> TestNode {
    init_tracing();
    let store = Arc::new(InMemoryDagStore::new());
    let names = Arc::new(InMemoryNameStore::new());
    let pins = Arc::new(InMemoryPinStore::new());
    let api = CoreApi::new(store.clone(), names.clone(), pins.clone(), config).unwrap();
    TestNode {
        store,
        names,
        pins,
        api,
    }
}

/// Deterministic pseudo-random bytes.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// Read a whole file node, panicking on anything else.
pub async fn read_file(node: UnixfsNode) -> Vec<u8> {
    match node {
        UnixfsNode::File(mut file) => file.read_to_end().await.unwrap(),
        other => panic!("expected a file, got {other:?}"),
    }
}
