// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background task wiring auth and store change notifications into the
//! reconciler.

use super::SyncReconciler;
use tokio::task::JoinHandle;

impl SyncReconciler {
    /// Spawn the driver loop. Returns immediately; abort the handle to stop.
    ///
    /// When sync is not configured the task exits at once and nothing ever
    /// touches the network.
    pub fn spawn(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run().await })
    }

    async fn run(self) {
        if !self.is_configured() {
            tracing::info!("Cloud sync not configured, running local only");
            return;
        }

        let mut auth_rx = self.auth().subscribe();
        let mut store_rx = self.store().subscribe();

        let initial = auth_rx.borrow_and_update().clone();
        self.handle_auth_state(&initial);
        store_rx.borrow_and_update();

        tracing::info!("Sync driver started");

        loop {
            tokio::select! {
                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = auth_rx.borrow_and_update().clone();
                    self.handle_auth_state(&state);
                }
                changed = store_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    store_rx.borrow_and_update();
                    self.notify_local_change();
                }
            }
        }

        tracing::info!("Sync driver stopped");
    }
}
