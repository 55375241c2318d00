use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

use crate::{
    error::{AppError, Result},
    models::websocket::{OutboundEvent, PushFrame, TransportEvent, EVENT_REGISTER},
    utils::emitter::EventEmitter,
};

/// 推送通道的传输层
///
/// 实现方负责连接、断线重连；上层只通过事件分发器订阅事件，
/// 并在需要时发送出站事件。
pub trait PushTransport: Send + Sync {
    fn is_connected(&self) -> bool;

    /// 开始建立连接，重复调用不会打开第二个连接
    fn open(&self);

    /// 未连接时返回 `AppError::NotConnected`，不会缓存
    fn send(&self, event: &OutboundEvent) -> Result<()>;

    fn events(&self) -> &EventEmitter<TransportEvent>;
}

/// 进程内传输层，用于测试和离线预览
///
/// 不做任何网络IO，连接状态和入站事件都由调用方驱动。
#[derive(Default)]
pub struct MemoryTransport {
    connected: AtomicBool,
    open_calls: AtomicUsize,
    sent: Mutex<Vec<PushFrame>>,
    events: EventEmitter<TransportEvent>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟连接成功（包括重连）
    pub fn simulate_connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.events.emit(&TransportEvent::Connected);
    }

    pub fn simulate_disconnect(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.events.emit(&TransportEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// 模拟服务端推送一帧
    pub fn deliver(&self, event: &str, data: serde_json::Value) {
        self.events.emit(&TransportEvent::Frame(PushFrame {
            event: event.to_string(),
            data,
        }));
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn sent_frames(&self) -> Vec<PushFrame> {
        self.sent.lock().clone()
    }

    /// 已发送的注册握手中携带的用户ID，按发送顺序
    pub fn registrations(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|frame| frame.event == EVENT_REGISTER)
            .filter_map(|frame| frame.data.get("userId").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

impl PushTransport for MemoryTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn open(&self) {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        debug!("Memory transport open requested");
    }

    fn send(&self, event: &OutboundEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(AppError::NotConnected);
        }
        self.sent.lock().push(event.to_frame()?);
        Ok(())
    }

    fn events(&self) -> &EventEmitter<TransportEvent> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_requires_connection() {
        let transport = MemoryTransport::new();
        let event = OutboundEvent::register("u1");

        assert!(matches!(transport.send(&event), Err(AppError::NotConnected)));
        assert!(transport.sent_frames().is_empty());

        transport.simulate_connect();
        transport.send(&event).unwrap();
        assert_eq!(transport.registrations(), vec!["u1".to_string()]);

        transport.simulate_disconnect("server restart");
        assert!(!transport.is_connected());
        assert!(transport.send(&event).is_err());
    }
}
