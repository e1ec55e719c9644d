use checkout_engine::{events::EventProducers, CheckoutApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::MomoGateway;

/// Starts the payment reconciliation worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// Provider callbacks can be lost; this worker periodically sweeps orders that have been
/// `AwaitingPayment` past the grace period and polls the provider for them, so no order hangs
/// forever waiting for a callback that will never arrive.
pub fn start_poll_worker(
    db: SqliteDatabase,
    gateway: MomoGateway,
    producers: EventProducers,
    interval: std::time::Duration,
    grace: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = CheckoutApi::new(db, gateway, producers);
        info!("🕰️ Payment reconciliation worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Sweeping orders awaiting payment");
            match api.reconcile_stale_orders(grace).await {
                Ok(0) => {},
                Ok(n) => info!("🕰️ {n} stale order(s) driven to a terminal state"),
                Err(e) => error!("🕰️ Error running payment reconciliation sweep: {e}"),
            }
        }
    })
}
