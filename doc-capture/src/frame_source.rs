use doc_types::Frame;

/// Inbound boundary: delivers frames to the analyzer. Delivery is
/// serialized by the implementor; at most one un-acknowledged frame is
/// ever held by the core at a time. The source retains ownership of the
/// pixel buffers and reclaims them once the callback returns.
pub trait FrameSource {
    /// Deliver the next frame to `handler`. Implementations are free to
    /// drop queued frames on backpressure; they must never block the
    /// analyzer indefinitely.
    fn deliver(&mut self, handler: &mut dyn FnMut(Frame<'_>));
}

/// One-slot "keep only latest" queue: if a frame arrives while a
/// previous one is still queued, the older frame is dropped in favor of
/// the new one (spec §5's concurrency model).
pub struct LatestFrameQueue {
    sender: crossbeam_channel::Sender<doc_types::OwnedLumaFrame>,
    receiver: crossbeam_channel::Receiver<doc_types::OwnedLumaFrame>,
}

impl Default for LatestFrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestFrameQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        Self { sender, receiver }
    }

    /// Push a frame, discarding whatever was previously queued.
    pub fn push(&self, frame: doc_types::OwnedLumaFrame) {
        // Drain any stale frame first so the bounded(1) channel never
        // blocks the producer.
        let _ = self.receiver.try_recv();
        let _ = self.sender.try_send(frame);
    }

    /// Take the latest queued frame, if any.
    pub fn try_take(&self) -> Option<doc_types::OwnedLumaFrame> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushing_twice_keeps_only_the_latest_frame() {
        let queue = LatestFrameQueue::new();
        queue.push(doc_types::OwnedLumaFrame { width: 2, height: 2, luma: vec![1; 4] });
        queue.push(doc_types::OwnedLumaFrame { width: 2, height: 2, luma: vec![2; 4] });
        let taken = queue.try_take().unwrap();
        assert_eq!(taken.luma, vec![2; 4]);
        assert!(queue.try_take().is_none());
    }
}
