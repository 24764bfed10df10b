use std::sync::Weak;

use tokio::sync::mpsc;

use crate::mailbox::Mailbox;
use crate::{Actor, Message};

/// Drives the actor until every strong handle is gone.
///
/// Dropping the last [`Actor`] drops the sender half of the channel, so
/// `recv` drains what is already queued and then returns `None`.
#[inline]
pub async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<Box<dyn Message<S>>>,
) {
    debug!("running");
    while let Some(msg) = msg_rx.recv().await {
        let Some(mailbox) = mailbox.upgrade() else {
            warn!("no handle left, dropping {msg:?}");
            break;
        };
        let handle = Actor::from_mailbox(mailbox);
        trace_span!("handle", ?msg).in_scope(|| msg.handle(&mut state, &handle));
    }
    debug!("stopped");
}
