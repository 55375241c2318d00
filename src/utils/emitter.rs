use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// 订阅句柄，用于显式取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// 类型化事件分发器
///
/// 监听器按订阅顺序同步调用。分发前会先复制监听器列表并释放锁，
/// 因此监听器内部可以再订阅或取消订阅，不会死锁；
/// 在一次分发过程中被取消的监听器不会再收到本次事件之后的事件。
pub struct EventEmitter<E> {
    listeners: Mutex<Vec<(ListenerHandle, Listener<E>)>>,
    next_id: AtomicU64,
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((handle, Arc::new(listener)));
        handle
    }

    /// 返回该句柄此前是否处于订阅状态
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        listeners.len() != before
    }

    pub fn is_subscribed(&self, handle: ListenerHandle) -> bool {
        self.listeners.lock().iter().any(|(h, _)| *h == handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn emit(&self, event: &E) {
        let snapshot: Vec<_> = self.listeners.lock().clone();
        for (handle, listener) in snapshot {
            // 前一个监听器可能已经取消了这个订阅
            if self.is_subscribed(handle) {
                listener(event);
            }
        }
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let emitter = EventEmitter::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let counter = total.clone();
        let handle = emitter.subscribe(move |n| {
            counter.fetch_add(*n as usize, Ordering::SeqCst);
        });

        emitter.emit(&2);
        emitter.emit(&3);
        assert_eq!(total.load(Ordering::SeqCst), 5);

        assert!(emitter.unsubscribe(handle));
        assert!(!emitter.unsubscribe(handle));

        emitter.emit(&10);
        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_listener_can_unsubscribe_another_mid_dispatch() {
        let emitter = Arc::new(EventEmitter::<()>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let second_slot = Arc::new(Mutex::new(None::<ListenerHandle>));
        let slot = second_slot.clone();
        let emitter_ref = emitter.clone();
        emitter.subscribe(move |_| {
            if let Some(handle) = *slot.lock() {
                emitter_ref.unsubscribe(handle);
            }
        });

        let counter = calls.clone();
        let second = emitter.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *second_slot.lock() = Some(second);

        emitter.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.listener_count(), 1);
    }
}
