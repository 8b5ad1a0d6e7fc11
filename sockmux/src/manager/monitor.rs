/*!
 * Monitor Task
 * Background loop polling registered descriptors on a cadence
 *
 * Spawned by the first registration and respawned as needed; exits
 * voluntarily once the registry is empty. The loop holds only a weak
 * reference to the manager internals so a torn-down manager lets it
 * exit at the next tick.
 */

use super::poll::poll_step;
use super::ManagerInner;
use log::{debug, error, info};
use std::sync::{Arc, Weak};
use std::time::Duration;

pub(crate) fn spawn(inner: &Arc<ManagerInner>) {
    let config = &inner.config;
    info!(
        "socket monitor starting: interval {:?}, priority {:?}",
        config.monitor_interval, config.monitor_priority
    );
    tokio::spawn(run(Arc::downgrade(inner), config.monitor_interval));
}

async fn run(manager: Weak<ManagerInner>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        let Some(inner) = manager.upgrade() else {
            debug!("socket monitor exiting: manager dropped");
            return;
        };

        let ready = {
            let registry = inner.registry.lock();
            match poll_step(&registry) {
                Ok(ready) => ready,
                Err(errno) => {
                    drop(registry);
                    error!("readiness poll failed: {}", errno);
                    inner.handle_poll_failure(errno);
                    return;
                }
            }
        };

        inner.dispatch(ready);

        // Exit once nothing is registered; the next add respawns us.
        let mut registry = inner.registry.lock();
        if registry.is_empty() {
            registry.set_monitoring(false);
            drop(registry);
            debug!("socket monitor stopped: no sockets registered");
            return;
        }
    }
}
