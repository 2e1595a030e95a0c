#![allow(dead_code)]

use routebind::binder::{MemorySessionStore, SessionStore};
use routebind::dispatcher::Dispatcher;
use routebind::runtime_config::RuntimeConfig;
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary; `RUST_LOG=routebind=debug`
/// shows the dispatch trail.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Dispatcher with default config, independent of the environment.
pub fn dispatcher() -> Dispatcher {
    init_tracing();
    Dispatcher::with_config(RuntimeConfig::default())
}

/// Dispatcher with a memory session store holding one session.
pub fn dispatcher_with_session(
    values: &[(&str, serde_json::Value)],
) -> (Dispatcher, Arc<MemorySessionStore>, String) {
    let mut dispatcher = dispatcher();
    let store = Arc::new(MemorySessionStore::new());
    let session_id = store.create();
    for (key, value) in values {
        store.put(&session_id, key, value.clone());
    }
    dispatcher.set_session_store(Arc::clone(&store) as Arc<dyn SessionStore>);
    (dispatcher, store, session_id)
}
