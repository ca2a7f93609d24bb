//! Swap event intake: decoded swap events in, two concurrent volume legs out.

use crate::campaign::CampaignService;
use crate::domain::Address;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// USDC token decimals on the monitored pair.
pub const USDC_DECIMALS: u32 = 6;

/// A swap on the monitored pair, amounts already decimal-adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    pub sender: Address,
    pub amount_in: f64,
    pub amount_out: f64,
}

impl SwapEvent {
    /// Build an event from raw token base units.
    pub fn from_base_units(sender: Address, amount_in: u128, amount_out: u128, decimals: u32) -> Self {
        Self {
            sender,
            amount_in: to_decimal_amount(amount_in, decimals),
            amount_out: to_decimal_amount(amount_out, decimals),
        }
    }
}

fn to_decimal_amount(raw: u128, decimals: u32) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Consumes swap events one at a time and records both legs of each.
#[derive(Clone)]
pub struct SwapIngestor {
    service: Arc<CampaignService>,
}

impl SwapIngestor {
    pub fn new(service: Arc<CampaignService>) -> Self {
        Self { service }
    }

    /// Drain `rx` until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<SwapEvent>) {
        info!("Swap ingestor started");
        while let Some(event) = rx.recv().await {
            self.process(event).await;
        }
        info!("Swap ingestor stopped, channel closed");
    }

    /// Record the inbound and outbound legs as two independent tasks.
    ///
    /// The legs are not serialized against each other or against other
    /// events' legs; both are awaited before the next event is taken.
    pub async fn process(&self, event: SwapEvent) {
        debug!(
            sender = %event.sender,
            amount_in = event.amount_in,
            amount_out = event.amount_out,
            "Processing swap"
        );

        let legs = [("in", event.amount_in), ("out", event.amount_out)].map(|(leg, amount)| {
            let service = self.service.clone();
            let sender = event.sender.clone();
            let handle =
                tokio::spawn(async move { service.record_volume(&sender, amount).await });
            (leg, handle)
        });

        let (names, handles): (Vec<_>, Vec<_>) = legs.into_iter().unzip();
        for (leg, result) in names.into_iter().zip(join_all(handles).await) {
            match result {
                Ok(Ok(cumulative)) => {
                    debug!(sender = %event.sender, leg, cumulative, "Swap leg recorded")
                }
                Ok(Err(e)) => warn!(sender = %event.sender, leg, error = %e, "Swap leg not recorded"),
                Err(e) => error!(sender = %event.sender, leg, error = %e, "Swap leg task panicked"),
            }
        }
    }
}
