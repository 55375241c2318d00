pub mod alert;
pub mod api;
pub mod confirmation;
pub mod notification;
pub mod realtime;
pub mod transport;
pub mod websocket;

// 重新导出常用类型
pub use alert::{AlertCenter, AlertGesture, LogNavigator, Navigator, Theme};
pub use api::{ApiClient, ModerationApi};
pub use confirmation::{ConfirmationFlow, ConfirmationPolicy, FlowOutcome, Phase};
pub use notification::NotificationInbox;
pub use realtime::NotificationChannel;
pub use transport::{MemoryTransport, PushTransport};
pub use websocket::WebSocketTransport;
