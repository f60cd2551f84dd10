//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

/// Records the order in which queued bodies start.
#[derive(Clone, Default)]
pub struct StartLog {
    entries: Arc<Mutex<Vec<u64>>>,
}

impl StartLog {
    pub fn record(&self, id: u64) {
        self.entries.lock().unwrap().push(id);
    }

    pub fn snapshot(&self) -> Vec<u64> {
        self.entries.lock().unwrap().clone()
    }
}

pub type StatusReply = Box<dyn FnOnce(Option<Vec<u8>>, Option<io::Error>) + Send>;

/// A callback-era service whose replies are released by the test.
///
/// Calls are parked in arrival order; `reply_next` answers the oldest one from
/// a separate thread.
#[derive(Clone, Default)]
pub struct ScriptedService {
    parked: Arc<Mutex<Vec<StatusReply>>>,
}

impl ScriptedService {
    pub fn fetch_status(
        &self,
        reply: impl FnOnce(Option<Vec<u8>>, Option<io::Error>) + Send + 'static,
    ) {
        self.parked.lock().unwrap().push(Box::new(reply));
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().unwrap().len()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.parked() < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn reply_next(&self, payload: Option<&[u8]>, error: Option<io::Error>) {
        let reply = self.parked.lock().unwrap().remove(0);
        let payload = payload.map(<[u8]>::to_vec);
        std::thread::spawn(move || reply(payload, error))
            .join()
            .unwrap();
    }
}
