//! Frame-counted deletion queue, used to keep GPU objects alive until no frame in flight can reference them.

#[derive(Debug)]
struct Item<T> {
    value: T,
    // Time to live
    ttl: u32,
}

/// Holds values for a fixed amount of frames before dropping them.
/// Values are expected to release their GPU object in their [`Drop`] implementation.
#[derive(Debug)]
pub struct DeletionQueue<T> {
    max_ttl: u32,
    items: Vec<Item<T>>,
}

impl<T> DeletionQueue<T> {
    /// Create a queue that keeps values alive for `max_ttl` calls to [`DeletionQueue::next_frame`].
    /// A `max_ttl` of zero is treated as one.
    pub fn new(max_ttl: u32) -> DeletionQueue<T> {
        DeletionQueue {
            max_ttl: max_ttl.max(1),
            items: vec![],
        }
    }

    /// Pushes a value onto the deletion queue.
    /// Note that this moves out of the parameter so that you can't access an object after
    /// it is pushed.
    pub fn push(&mut self, value: T) {
        self.items.push(Item {
            value,
            ttl: self.max_ttl,
        });
    }

    /// Advance the frame counter by one, decreasing time to live by one on each element.
    /// If time to live of an element reaches zero, it is deleted.
    pub fn next_frame(&mut self) {
        self.items.iter_mut().for_each(|item| item.ttl -= 1);
        self.items.retain(|item| item.ttl != 0);
    }

    /// Drop every queued value immediately.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of values waiting for deletion.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is waiting for deletion.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
