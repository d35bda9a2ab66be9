use async_trait::async_trait;
use calmstep_core::{Notifier, NotifyError, Reminder};
use tokio::io::AsyncWriteExt;

use crate::texts;

/// Delivers reminders by printing them to stdout, one line per reminder.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, reminder: &Reminder) -> Result<(), NotifyError> {
        let line = format!(
            "[reminder -> {}] {}\n",
            reminder.user_id,
            texts::reminder(reminder)
        );
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| NotifyError::Delivery {
                user_id: reminder.user_id.to_string(),
                message: e.to_string(),
            })?;
        stdout.flush().await.map_err(|_| NotifyError::Closed)
    }
}
