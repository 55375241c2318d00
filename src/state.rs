use std::sync::Arc;

use crate::{
    config::Config,
    error::Result,
    services::{
        alert::{AlertCenter, Navigator, Theme},
        api::{ApiClient, ModerationApi},
        confirmation::{ConfirmationFlow, ConfirmationPolicy},
        notification::NotificationInbox,
        realtime::NotificationChannel,
        transport::PushTransport,
        websocket::WebSocketTransport,
    },
};

/// 客户端外壳的共享状态
/// 包含配置、REST客户端、推送通道和通知通道
#[derive(Clone)]
pub struct ClientState {
    /// 应用配置
    pub config: Config,

    /// 后端REST客户端
    pub api: Arc<dyn ModerationApi>,

    /// 进程级共享的推送通道
    pub transport: Arc<dyn PushTransport>,

    /// 实时通知
    pub notifications: NotificationChannel,

    /// 二次确认策略
    pub policy: ConfirmationPolicy,
}

impl ClientState {
    /// 使用真实的后端连接创建
    pub fn new(config: Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let api: Arc<dyn ModerationApi> = Arc::new(ApiClient::new(&config)?);
        let transport: Arc<dyn PushTransport> = WebSocketTransport::shared(&config);
        Self::with_parts(config, api, transport, navigator)
    }

    /// 使用指定的接口和传输层创建
    pub fn with_parts(
        config: Config,
        api: Arc<dyn ModerationApi>,
        transport: Arc<dyn PushTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let policy = ConfirmationPolicy::new(config.escalated_subject_types()?);
        let alerts = AlertCenter::new(config.alert_duration(), Theme::from_config(&config), navigator);
        let notifications = NotificationChannel::new(transport.clone(), NotificationInbox::new(), alerts);

        Ok(Self {
            config,
            api,
            transport,
            notifications,
            policy,
        })
    }

    /// 会话身份变化时调用，身份为空表示已登出
    pub fn start_session(&self, session_user_id: Option<&str>) -> Result<()> {
        self.notifications.set_session(session_user_id)
    }

    pub fn end_session(&self) {
        self.notifications.end_session();
    }

    /// 为一次破坏性操作创建确认流程
    pub fn confirmation_flow(&self) -> ConfirmationFlow {
        ConfirmationFlow::new(self.api.clone(), self.policy.clone())
    }
}
