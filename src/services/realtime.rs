use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, Result},
    models::websocket::{InboundEvent, OutboundEvent, TransportEvent},
    services::{alert::AlertCenter, notification::NotificationInbox, transport::PushTransport},
    utils::emitter::ListenerHandle,
};

/// 实时通知通道
///
/// 每个登录会话绑定一次：挂载传输层监听器、发送注册握手，
/// 把收到的通知写入收件箱并弹出提醒。会话变化时先卸载旧监听器再重新挂载。
/// 传输层是进程级共享的，这里从不关闭它。
#[derive(Clone)]
pub struct NotificationChannel {
    transport: Arc<dyn PushTransport>,
    inbox: NotificationInbox,
    alerts: AlertCenter,
    session: Arc<Mutex<SessionBinding>>,
}

#[derive(Default)]
struct SessionBinding {
    user_id: Option<String>,
    // 每次绑定/解绑递增，旧监听器据此丢弃迟到的事件
    generation: u64,
    handles: Vec<ListenerHandle>,
    // 当前连接是否已发送过注册握手，断开时复位
    registered: bool,
}

impl SessionBinding {
    fn is_bound_to(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id) && !self.handles.is_empty()
    }
}

impl NotificationChannel {
    pub fn new(transport: Arc<dyn PushTransport>, inbox: NotificationInbox, alerts: AlertCenter) -> Self {
        Self {
            transport,
            inbox,
            alerts,
            session: Arc::new(Mutex::new(SessionBinding::default())),
        }
    }

    pub fn inbox(&self) -> &NotificationInbox {
        &self.inbox
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn session_user_id(&self) -> Option<String> {
        self.session.lock().user_id.clone()
    }

    pub fn is_attached(&self) -> bool {
        !self.session.lock().handles.is_empty()
    }

    /// 为会话建立通知通道
    ///
    /// 已连接时只重新发送注册握手；未连接时打开传输层，
    /// 由连接事件触发注册。空白的用户ID直接忽略，等待有效身份。
    pub fn connect(&self, session_user_id: &str) -> Result<()> {
        let user_id = session_user_id.trim();
        if user_id.is_empty() {
            debug!("No session identity, skipping push registration");
            return Ok(());
        }

        let already_bound = self.session.lock().is_bound_to(user_id);
        if !already_bound {
            if self.session_user_id().is_some() {
                self.end_session();
            }
            self.attach(user_id);
        }

        if self.transport.is_connected() {
            register_once(&self.session, self.transport.as_ref(), user_id)
        } else {
            debug!("Push channel not connected yet, opening for user: {}", user_id);
            self.transport.open();
            Ok(())
        }
    }

    /// 会话身份变化：新身份为空时结束会话，否则重新绑定
    pub fn set_session(&self, session_user_id: Option<&str>) -> Result<()> {
        match session_user_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(user_id) => self.connect(user_id),
            None => {
                self.end_session();
                Ok(())
            }
        }
    }

    /// 卸载本组件挂载的所有监听器，不关闭共享的传输层
    pub fn disconnect(&self) {
        let (handles, user_id) = {
            let mut session = self.session.lock();
            session.generation += 1;
            session.registered = false;
            (std::mem::take(&mut session.handles), session.user_id.take())
        };

        let events = self.transport.events();
        for handle in &handles {
            events.unsubscribe(*handle);
        }

        if let Some(user_id) = user_id {
            info!("Detached {} push listener(s) for user: {}", handles.len(), user_id);
        }
    }

    /// 会话结束：卸载监听器并丢弃该会话的通知和提醒
    pub fn end_session(&self) {
        self.disconnect();
        self.inbox.clear();
        self.alerts.dismiss_current();
    }

    fn attach(&self, user_id: &str) {
        let generation = {
            let mut session = self.session.lock();
            session.generation += 1;
            session.registered = false;
            session.user_id = Some(user_id.to_string());
            session.generation
        };

        let transport: Weak<dyn PushTransport> = Arc::downgrade(&self.transport);
        let session = self.session.clone();
        let inbox = self.inbox.clone();
        let alerts = self.alerts.clone();
        let owner = user_id.to_string();

        let handle = self.transport.events().subscribe(move |event: &TransportEvent| {
            {
                let mut binding = session.lock();
                if binding.generation != generation {
                    debug!("Dropping push event for stale session: {}", owner);
                    return;
                }
                if matches!(event, TransportEvent::Disconnected { .. }) {
                    binding.registered = false;
                }
            }

            match event {
                TransportEvent::Connected => {
                    if let Some(transport) = transport.upgrade() {
                        if let Err(e) = register_once(&session, transport.as_ref(), &owner) {
                            warn!("Failed to register push session for {}: {}", owner, e);
                        }
                    }
                }
                TransportEvent::Disconnected { reason } => {
                    warn!("Push channel lost for user {}: {}", owner, reason);
                }
                TransportEvent::Frame(frame) => match frame.clone().into_inbound() {
                    Ok(InboundEvent::NewNotification(notification)) => {
                        let unread = inbox.push(notification.clone());
                        info!("New notification {} for user {} (unread: {})", notification.id, owner, unread);
                        alerts.raise(notification);
                    }
                    Ok(InboundEvent::Unknown(name)) => {
                        debug!("Ignoring push event: {}", name);
                    }
                    Err(e) => {
                        warn!("Dropping malformed notification: {}", e);
                    }
                },
            }
        });

        self.session.lock().handles.push(handle);
        info!("Attached push listener for user: {}", user_id);
    }
}

/// 每个连接只发送一次注册握手；未连接时留给下一次连接事件处理
///
/// 连接事件和 `connect()` 可能在不同线程上看到同一个连接，
/// 检查和发送都在会话锁内完成。
fn register_once(session: &Mutex<SessionBinding>, transport: &dyn PushTransport, user_id: &str) -> Result<()> {
    let mut binding = session.lock();
    if binding.registered {
        debug!("Push session already registered for user: {}", user_id);
        return Ok(());
    }

    match transport.send(&OutboundEvent::register(user_id)) {
        Ok(()) => {
            binding.registered = true;
            debug!("Registered push session for user: {}", user_id);
            Ok(())
        }
        Err(AppError::NotConnected) => {
            debug!("Push channel dropped before registration, will retry on reconnect");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        alert::{Navigator, Theme},
        transport::MemoryTransport,
    };
    use serde_json::json;
    use std::time::Duration;

    struct NoopNavigator;

    impl Navigator for NoopNavigator {
        fn navigate(&self, _path: &str) {}
    }

    fn setup() -> (Arc<MemoryTransport>, NotificationChannel) {
        let transport = Arc::new(MemoryTransport::new());
        let alerts = AlertCenter::new(Duration::from_secs(5), Theme::default(), Arc::new(NoopNavigator));
        let channel = NotificationChannel::new(transport.clone(), NotificationInbox::new(), alerts);
        (transport, channel)
    }

    fn deliver(transport: &MemoryTransport, id: &str) {
        transport.deliver(
            "new-notification",
            json!({ "_id": id, "message": format!("event {}", id) }),
        );
    }

    #[test]
    fn test_connect_opens_then_registers_on_connect_event() {
        let (transport, channel) = setup();
        channel.connect("u1").unwrap();

        assert_eq!(transport.open_calls(), 1);
        assert!(transport.registrations().is_empty());

        transport.simulate_connect();
        assert_eq!(transport.registrations(), vec!["u1"]);
    }

    #[test]
    fn test_connect_while_connected_registers_once() {
        let (transport, channel) = setup();
        transport.simulate_connect();

        channel.connect("u1").unwrap();
        channel.connect("u1").unwrap();

        assert_eq!(transport.open_calls(), 0);
        assert_eq!(transport.registrations(), vec!["u1"]);
        assert_eq!(transport.events().listener_count(), 1);
    }

    #[test]
    fn test_each_reconnect_registers_exactly_once() {
        let (transport, channel) = setup();
        channel.connect("u1").unwrap();

        for _ in 0..3 {
            transport.simulate_connect();
            transport.simulate_disconnect("network");
        }
        transport.simulate_connect();

        assert_eq!(transport.registrations(), vec!["u1"; 4]);
    }

    #[test]
    fn test_blank_identity_does_not_register() {
        let (transport, channel) = setup();
        transport.simulate_connect();

        channel.connect("   ").unwrap();
        channel.set_session(None).unwrap();

        assert!(transport.registrations().is_empty());
        assert!(!channel.is_attached());
    }

    #[test]
    fn test_notifications_update_inbox_and_alert() {
        let (transport, channel) = setup();
        channel.connect("u1").unwrap();
        transport.simulate_connect();

        deliver(&transport, "n1");
        deliver(&transport, "n2");

        assert_eq!(channel.inbox().unread_count(), 2);
        let ids: Vec<_> = channel.inbox().notifications().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["n2", "n1"]);
        assert_eq!(channel.alerts().current().map(|a| a.notification.id).as_deref(), Some("n2"));
    }

    #[test]
    fn test_malformed_and_unknown_events_are_ignored() {
        let (transport, channel) = setup();
        channel.connect("u1").unwrap();

        transport.deliver("new-notification", json!({ "message": "no id" }));
        transport.deliver("typing", json!({ "user": "bob" }));

        assert_eq!(channel.inbox().unread_count(), 0);
        assert!(channel.alerts().current().is_none());
    }

    #[test]
    fn test_session_change_detaches_old_listener() {
        let (transport, channel) = setup();
        transport.simulate_connect();
        channel.connect("u1").unwrap();
        deliver(&transport, "n1");

        channel.set_session(Some("u2")).unwrap();
        assert_eq!(channel.session_user_id().as_deref(), Some("u2"));
        assert_eq!(transport.events().listener_count(), 1);
        assert!(channel.inbox().is_empty());

        transport.simulate_disconnect("network");
        transport.simulate_connect();
        assert_eq!(transport.registrations(), vec!["u1", "u2", "u2"]);
    }

    #[test]
    fn test_cleared_session_ignores_later_events() {
        let (transport, channel) = setup();
        transport.simulate_connect();
        channel.connect("u1").unwrap();

        channel.set_session(None).unwrap();
        deliver(&transport, "n1");
        transport.simulate_connect();

        assert_eq!(transport.events().listener_count(), 0);
        assert_eq!(channel.inbox().unread_count(), 0);
        assert!(channel.alerts().current().is_none());
        assert_eq!(transport.registrations(), vec!["u1"]);
    }

    #[test]
    fn test_connected_event_after_connect_does_not_register_twice() {
        let (transport, channel) = setup();
        transport.simulate_connect();

        // 连接事件在 connect() 完成注册之后才送达同一个连接
        channel.connect("u1").unwrap();
        transport.events().emit(&TransportEvent::Connected);
        assert_eq!(transport.registrations(), vec!["u1"]);

        transport.simulate_disconnect("network");
        transport.simulate_connect();
        assert_eq!(transport.registrations(), vec!["u1", "u1"]);
    }

    #[test]
    fn test_sender_without_user_name_is_still_counted() {
        let (transport, channel) = setup();
        channel.connect("u1").unwrap();
        transport.simulate_connect();

        transport.deliver(
            "new-notification",
            json!({ "_id": "n1", "message": "hi", "sender": { "_id": "u9", "displayName": "Alice" } }),
        );

        assert_eq!(channel.inbox().unread_count(), 1);
        let alert = channel.alerts().current().unwrap();
        assert_eq!(alert.notification.id, "n1");
        assert!(alert.notification.target_path().is_none());
    }
}
