//! Pipeline events fanned out to in-process subscribers.

use std::pin::Pin;

use futures_util::Stream;
use storyreel_models::{AudioState, ContentItem, ItemId, PipelineEvent, SceneSlot, VideoStats};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Boxed event stream handed to subscribers.
pub type EventStream = Pin<Box<dyn Stream<Item = PipelineEvent> + Send>>;

/// Channel for publishing/subscribing to pipeline events.
///
/// Publishing never blocks; subscribers that fall more than `capacity` events
/// behind skip the missed events.
#[derive(Debug, Clone)]
pub struct ProgressChannel {
    sender: broadcast::Sender<PipelineEvent>,
}

impl ProgressChannel {
    /// Create a new progress channel.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn publish(&self, event: PipelineEvent) -> usize {
        debug!(event = event.type_name(), "Publishing pipeline event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Publish a log message.
    pub fn log(&self, message: impl Into<String>) {
        self.publish(PipelineEvent::log(message));
    }

    /// Publish an Analyze+Script progress tick.
    pub fn progress(&self, completed: usize, total: usize) {
        self.publish(PipelineEvent::progress(completed, total));
    }

    pub fn items_selected(&self, items: Vec<ContentItem>) {
        self.publish(PipelineEvent::ItemsSelected { items });
    }

    pub fn stats_resolved(&self, item_id: ItemId, stats: VideoStats) {
        self.publish(PipelineEvent::StatsResolved { item_id, stats });
    }

    pub fn item_updated(&self, item: ContentItem) {
        self.publish(PipelineEvent::ItemUpdated { item });
    }

    /// Publish a keyed image slot write.
    pub fn slot(&self, item_id: ItemId, index: usize, slot: SceneSlot) {
        self.publish(PipelineEvent::slot(item_id, index, slot));
    }

    pub fn audio(&self, item_id: ItemId, audio: AudioState) {
        self.publish(PipelineEvent::AudioUpdated { item_id, audio });
    }

    /// Publish a one-shot notification for an item.
    pub fn notify(&self, item_id: ItemId, message: impl Into<String>) {
        self.publish(PipelineEvent::notification(item_id, message));
    }

    /// Publish a user-facing error with its technical details.
    pub fn error(&self, message: impl Into<String>, details: impl Into<String>) {
        self.publish(PipelineEvent::error(message, details));
    }

    /// Publish done message.
    pub fn done(&self, completed: usize, total: usize) {
        self.publish(PipelineEvent::Done { completed, total });
    }

    /// Subscribe to events published from now on.
    /// Returns a pinned stream that can be polled with `.next()`.
    pub fn subscribe(&self) -> EventStream {
        Box::pin(receiver_stream(self.sender.subscribe()))
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Adapt a broadcast receiver to a stream that ends when the channel closes.
pub(crate) fn receiver_stream(
    receiver: broadcast::Receiver<PipelineEvent>,
) -> impl Stream<Item = PipelineEvent> + Send {
    futures_util::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_subscribe_receives_in_order() {
        let channel = ProgressChannel::new(16);
        let mut stream = channel.subscribe();

        channel.log("hello");
        channel.progress(1, 4);
        channel.done(4, 4);

        assert_eq!(stream.next().await.unwrap().type_name(), "log");
        match stream.next().await.unwrap() {
            PipelineEvent::Progress { completed, total } => assert_eq!((completed, total), (1, 4)),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(stream.next().await.unwrap().is_terminal());
    }

    #[test]
    fn test_stream_wakes_on_publish() {
        let channel = ProgressChannel::new(4);
        let mut stream = channel.subscribe();
        let mut next = tokio_test::task::spawn(stream.next());

        tokio_test::assert_pending!(next.poll());
        channel.log("now");
        assert!(next.is_woken());
        let event = tokio_test::assert_ready!(next.poll());
        assert_eq!(event.map(|e| e.type_name()), Some("log"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let channel = ProgressChannel::new(4);
        assert_eq!(channel.publish(PipelineEvent::log("nobody listening")), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_channel_dropped() {
        let channel = ProgressChannel::new(4);
        let mut stream = channel.subscribe();
        channel.log("last");
        drop(channel);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips() {
        let channel = ProgressChannel::new(2);
        let mut stream = channel.subscribe();
        for i in 0..5 {
            channel.progress(i, 5);
        }
        drop(channel);

        let received: Vec<_> = stream.by_ref().collect().await;
        assert_eq!(received.len(), 2);
    }
}
