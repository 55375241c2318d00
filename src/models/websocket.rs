use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::notification::Notification;

/// 推送通道事件名
pub const EVENT_REGISTER: &str = "register";
pub const EVENT_NEW_NOTIFICATION: &str = "new-notification";

/// 推送帧
/// 线上格式: {"event": "<name>", "data": <payload>}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// 注册握手载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// 客户端发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Register(RegisterPayload),
}

/// 服务端推送的事件
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    NewNotification(Notification),
    Unknown(String),
}

/// 传输层事件
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// 连接建立（包括重连）
    Connected,
    Disconnected { reason: String },
    Frame(PushFrame),
}

impl OutboundEvent {
    pub fn register(user_id: &str) -> Self {
        OutboundEvent::Register(RegisterPayload {
            user_id: user_id.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Register(_) => EVENT_REGISTER,
        }
    }

    pub fn to_frame(&self) -> serde_json::Result<PushFrame> {
        let data = match self {
            OutboundEvent::Register(payload) => serde_json::to_value(payload)?,
        };

        Ok(PushFrame {
            event: self.name().to_string(),
            data,
        })
    }
}

impl PushFrame {
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 解析为具体的服务端事件
    pub fn into_inbound(self) -> serde_json::Result<InboundEvent> {
        match self.event.as_str() {
            EVENT_NEW_NOTIFICATION => {
                let notification: Notification = serde_json::from_value(self.data)?;
                Ok(InboundEvent::NewNotification(notification))
            }
            _ => Ok(InboundEvent::Unknown(self.event)),
        }
    }
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::Connected => write!(f, "connected"),
            TransportEvent::Disconnected { reason } => write!(f, "disconnected ({})", reason),
            TransportEvent::Frame(frame) => write!(f, "frame {}", frame.event),
        }
    }
}
