//! Background expiration of idle connections
//!
//! One thread per pool sleeps until the earliest expiration instant, runs an
//! expiration pass, and goes back to sleep. A release that moves the next
//! expiration earlier wakes it through `Shared::sweeper_wake`. Pool
//! destruction wakes it for the last time and the thread exits.

use crate::factory::ConnectionFactory;
use crate::pool::Shared;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error};

pub(crate) struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn<F: ConnectionFactory>(shared: Arc<Shared<F>>) -> std::io::Result<Self> {
        let handle = std::thread::Builder::new()
            .name(format!("xapool-sweeper-{}", shared.config.name))
            .spawn(move || run(shared))?;
        Ok(Self { handle })
    }

    /// Wait for the thread to exit; the pool must already be destroyed
    pub(crate) fn join(self) {
        if self.handle.join().is_err() {
            error!("sweeper thread panicked");
        }
    }
}

fn run<F: ConnectionFactory>(shared: Arc<Shared<F>>) {
    debug!(pool = %shared.config.name, "sweeper started");
    let mut state = shared.state.lock();
    loop {
        if state.destroyed {
            break;
        }
        match state.next_expiration {
            Some(at) if at <= Instant::now() => {
                drop(state);
                shared.expire();
                state = shared.state.lock();
            }
            Some(at) => {
                shared.sweeper_wake.wait_until(&mut state, at);
            }
            None => shared.sweeper_wake.wait(&mut state),
        }
    }
    drop(state);
    debug!(pool = %shared.config.name, "sweeper stopped");
}
