use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use tracing::debug;

use crate::models::notification::Notification;

/// 当前会话的未读通知
///
/// 通知按到达顺序倒序保存（最新的在最前），只保存在内存中。
#[derive(Clone, Default)]
pub struct NotificationInbox {
    inner: Arc<Mutex<InboxState>>,
}

#[derive(Default)]
struct InboxState {
    notifications: VecDeque<Notification>,
    unread: u64,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收到新通知，返回新的未读数
    pub fn push(&self, notification: Notification) -> u64 {
        let mut state = self.inner.lock();
        debug!("Inbox received notification: {}", notification.id);
        state.notifications.push_front(notification);
        state.unread += 1;
        state.unread
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.lock().unread
    }

    /// 最新的在最前
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock().notifications.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.inner.lock().notifications.front().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().notifications.is_empty()
    }

    /// 打开通知页时由外部调用，只清零计数
    pub fn reset_unread(&self) {
        self.inner.lock().unread = 0;
    }

    /// 全部标记为已读：清空列表和计数
    pub fn mark_all_read(&self) {
        let mut state = self.inner.lock();
        state.notifications.clear();
        state.unread = 0;
    }

    /// 会话结束
    pub fn clear(&self) {
        self.mark_all_read();
    }
}
