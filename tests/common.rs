//! Test utilities & fixtures.
//! Builds a dispatcher over a throwaway sled database.

use std::sync::Arc;
use std::time::Duration;

use shalebot::bot::hunt::{HuntEngine, SpawnTiming};
use shalebot::bot::Dispatcher;
use shalebot::config::Config;
use shalebot::storage::BotStore;
use tokio::sync::mpsc;

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: BotStore,
    pub hunt: Arc<HuntEngine>,
    pub dispatcher: Dispatcher,
    pub rx: mpsc::UnboundedReceiver<String>,
}

#[allow(dead_code)] // not every test file uses every helper
impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BotStore::open(dir.path()).expect("open store");
        let (tx, rx) = mpsc::unbounded_channel();
        let timing = SpawnTiming {
            min_delay: Duration::from_secs(600),
            max_delay: Duration::from_secs(1200),
            fixed_delay: None,
        };
        let hunt = Arc::new(HuntEngine::new(store.clone(), tx.clone(), timing));
        let dispatcher = Dispatcher::new(&config, store.clone(), Arc::clone(&hunt), tx);
        Self { dir, store, hunt, dispatcher, rx }
    }

    /// Feed one line and collect every reply produced synchronously.
    pub fn say(&mut self, nick: &str, text: &str) -> Vec<String> {
        self.dispatcher.handle_message(nick, text);
        self.drain()
    }

    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            out.push(line);
        }
        out
    }
}
