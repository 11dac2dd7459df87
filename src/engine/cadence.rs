use super::Command;
use chrono::{Local, Timelike, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Periodic driver of the density simulator and the duty scheduler.
///
/// Holds only a weak sender so it never keeps the engine alive; it ends when
/// aborted by the engine or once the engine has shut down.
pub(super) async fn run_cadence(commands: mpsc::WeakSender<Command>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick of a tokio interval completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let Some(sender) = commands.upgrade() else {
            break;
        };

        let now = Utc::now();
        let hour = Local::now().hour();

        if sender
            .send(Command::Tick {
                hour,
                now,
                reply: None,
            })
            .await
            .is_err()
        {
            break;
        }

        if sender
            .send(Command::AdvanceDuty { now, reply: None })
            .await
            .is_err()
        {
            break;
        }
    }
}
