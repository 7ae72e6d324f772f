use std::time::Duration;

use bson::oid::ObjectId;
use eyre::{Context as _, Error};
use ledger::Ledger;
use log::{error, info};
use notify::mailer::Mailer;
use tokio::time;

mod outbox;

const DRAIN_INTERVAL: Duration = Duration::from_secs(30);

/// Background side-effect processing: drains the notification outbox
/// through the mailer on a fixed interval. Failures are recorded on the
/// outbox entry and logged; the loop never stops.
pub fn start(ledger: Ledger, mailer: Mailer) {
    tokio::spawn(async move {
        let processor = outbox::OutboxDrain::new(ledger, mailer);
        // Outbox work runs under a synthetic system actor.
        let actor = ObjectId::new();
        let mut interval = time::interval(DRAIN_INTERVAL);
        info!("Notification outbox drain started");
        loop {
            interval.tick().await;
            if let Err(err) = process(&processor, actor).await {
                error!("Error in background process: {:#}", err);
            }
        }
    });
}

async fn process(processor: &outbox::OutboxDrain, actor: ObjectId) -> Result<(), Error> {
    let mut session = processor
        .ledger
        .db
        .start_session(actor)
        .await
        .context("start outbox session")?;
    processor
        .drain(&mut session)
        .await
        .context("drain notification outbox")?;
    Ok(())
}
