//! Transport collaborator

use smol::channel::{self, Receiver, Sender};
use smol::future::Boxed;

use crate::{CancelToken, NetError, Response, TransferProgress};

/// Performs one GET for a URI.
///
/// Implementations report byte progress through the sink while the transfer
/// is in flight and should stop reading once `cancel` is observed. The sink is
/// dropped when the returned future completes.
pub trait Transport: Send + Sync {
    fn get(&self, uri: &str, progress: ProgressSink, cancel: CancelToken) -> Boxed<Result<Response, NetError>>;
}

/// Sending half of a progress channel.
///
/// Safe to use from blocking worker threads; reports are marshalled back to
/// whichever task drains the paired receiver.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Sender<TransferProgress>,
}

impl ProgressSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, Receiver<TransferProgress>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn report(&self, received: u64, total: Option<u64>) {
        // A closed receiver means nobody is listening any more
        let _ = self.tx.try_send(TransferProgress::new(received, total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, rx) = ProgressSink::channel();
        sink.report(1, Some(4));
        sink.report(2, Some(4));
        drop(sink);

        assert_eq!(rx.try_recv().unwrap(), TransferProgress::new(1, Some(4)));
        assert_eq!(rx.try_recv().unwrap(), TransferProgress::new(2, Some(4)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sink_outlives_receiver() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.report(1, None);
    }
}
