use eyre::Error;
use ledger::Ledger;
use log::{error, info};
use model::session::Session;
use notify::mailer::Mailer;

const BATCH: i64 = 50;

pub struct OutboxDrain {
    pub ledger: Ledger,
    mailer: Mailer,
}

impl OutboxDrain {
    pub fn new(ledger: Ledger, mailer: Mailer) -> Self {
        OutboxDrain { ledger, mailer }
    }

    /// Send one batch of unsent notifications. A delivery failure bumps
    /// the attempt counter and keeps the entry for the next pass; it never
    /// aborts the batch.
    pub async fn drain(&self, session: &mut Session) -> Result<(), Error> {
        let pending = self.ledger.notifications.unsent(session, BATCH).await?;
        if pending.is_empty() {
            return Ok(());
        }
        info!("Sending {} queued notifications", pending.len());

        for notification in pending {
            match self.mailer.send(&notification).await {
                Ok(()) => {
                    self.ledger
                        .notifications
                        .mark_sent(session, notification.id)
                        .await?;
                }
                Err(err) => {
                    error!(
                        "Failed to send notification {} to {}: {}",
                        notification.id, notification.recipient.email, err
                    );
                    self.ledger
                        .notifications
                        .mark_failed(session, notification.id, &err.to_string())
                        .await?;
                }
            }
        }
        Ok(())
    }
}
