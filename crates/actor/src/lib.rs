//! A lightweight actor runtime.
//!
//! An actor owns its state and handles messages one at a time on a tokio
//! task, so the state never needs a lock. Handles are cheap to clone; the
//! actor stops once the last strong handle is dropped.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::{Actor, WeakActor};
pub use mailbox::Message;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;
    use tokio::time::timeout;

    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        on_drop: Option<oneshot::Sender<u32>>,
    }

    impl Drop for Counter {
        fn drop(&mut self) {
            if let Some(tx) = self.on_drop.take() {
                tx.send(self.value).ok();
            }
        }
    }

    #[derive(Debug)]
    struct AddMessage(u32);

    impl Message<Counter> for AddMessage {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            state.value += self.0;
        }
    }

    #[tokio::test]
    async fn test_send_and_ask() {
        let actor = Actor::spawn(Counter::default(), None);
        actor.send(AddMessage(40)).unwrap();
        actor.send(AddMessage(2)).unwrap();
        let value = actor.ask(|state, _| state.value).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_ask_can_send_to_self() {
        let actor = Actor::spawn(Counter::default(), Some("counter"));
        actor
            .ask(|_, handle| handle.send(AddMessage(7)).unwrap())
            .await
            .unwrap();
        let value = actor.ask(|state, _| state.value).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_stops_after_last_handle() {
        let (tx, rx) = oneshot::channel();
        let actor = Actor::spawn(
            Counter {
                value: 0,
                on_drop: Some(tx),
            },
            None,
        );
        let weak = actor.downgrade();
        actor.send(AddMessage(1)).unwrap();
        assert!(weak.upgrade().is_some());
        drop(actor);

        let value = timeout(Duration::from_millis(500), rx)
            .await
            .unwrap()
            .unwrap();
        // Queued messages are discarded once no strong handle is left.
        assert!(value <= 1);
        assert!(weak.upgrade().is_none());
        assert_eq!(weak.send(AddMessage(1)), Err(ActorDeadError));
    }
}
