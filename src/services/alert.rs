use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{config::Config, models::notification::Notification};

/// 页面跳转
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// 只记录日志的跳转实现，用于无界面运行
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        info!("Navigate to {}", path);
    }
}

/// 提醒的配色，由外部显式传入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub accent: String,
    pub background: String,
}

impl Theme {
    pub fn from_config(config: &Config) -> Self {
        Self {
            accent: config.theme_accent.clone(),
            background: config.theme_background.clone(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::from_config(&Config::default())
    }
}

/// 当前显示的提醒
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub notification: Notification,
    pub title: String,
    pub raised_at: DateTime<Utc>,
    pub theme: Theme,
}

/// 用户对提醒的一次操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertGesture {
    /// 点击提醒主体
    Body,
    /// 点击关闭按钮
    CloseButton,
}

/// 临时提醒
///
/// 同一时间只显示一条，新的提醒替换旧的。
/// 自动关闭计时只会关闭它对应的那一条提醒。
#[derive(Clone)]
pub struct AlertCenter {
    current: Arc<Mutex<Option<Alert>>>,
    duration: Duration,
    theme: Theme,
    navigator: Arc<dyn Navigator>,
}

impl AlertCenter {
    pub fn new(duration: Duration, theme: Theme, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            duration,
            theme,
            navigator,
        }
    }

    pub fn current(&self) -> Option<Alert> {
        self.current.lock().clone()
    }

    /// 显示提醒并启动自动关闭计时
    pub fn raise(&self, notification: Notification) -> Uuid {
        let id = Uuid::new_v4();
        let title = match notification.sender_label() {
            Some(sender) => format!("{}: {}", sender, notification.message),
            None => notification.message.clone(),
        };

        let alert = Alert {
            id,
            notification,
            title,
            raised_at: Utc::now(),
            theme: self.theme.clone(),
        };

        debug!("Raising alert {} for notification {}", id, alert.notification.id);
        *self.current.lock() = Some(alert);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let current = self.current.clone();
                let duration = self.duration;
                runtime.spawn(async move {
                    tokio::time::sleep(duration).await;
                    if Self::take_if(&current, id).is_some() {
                        debug!("Alert {} auto-dismissed", id);
                    }
                });
            }
            Err(_) => debug!("No runtime, alert {} will not auto-dismiss", id),
        }

        id
    }

    /// 关闭指定提醒，返回它是否仍在显示
    pub fn dismiss(&self, id: Uuid) -> bool {
        Self::take_if(&self.current, id).is_some()
    }

    pub fn dismiss_current(&self) {
        self.current.lock().take();
    }

    /// 处理一次用户操作，返回跳转的路径
    pub fn handle(&self, id: Uuid, gesture: AlertGesture) -> Option<String> {
        match gesture {
            AlertGesture::Body => self.click(id),
            AlertGesture::CloseButton => {
                self.close(id);
                None
            }
        }
    }

    /// 点击提醒：先关闭，再跳转到关联内容
    pub fn click(&self, id: Uuid) -> Option<String> {
        let alert = Self::take_if(&self.current, id)?;
        let path = alert.notification.target_path()?;
        self.navigator.navigate(&path);
        Some(path)
    }

    /// 点击关闭按钮：只关闭，不跳转
    pub fn close(&self, id: Uuid) -> bool {
        self.dismiss(id)
    }

    fn take_if(current: &Mutex<Option<Alert>>, id: Uuid) -> Option<Alert> {
        let mut current = current.lock();
        if current.as_ref().map(|a| a.id) == Some(id) {
            current.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationSender;

    /// 记录跳转，并检查跳转时提醒已经关闭
    struct RecordingNavigator {
        alerts: Mutex<Option<AlertCenter>>,
        visits: Mutex<Vec<(String, bool)>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, path: &str) {
            let still_visible = self
                .alerts
                .lock()
                .as_ref()
                .map(|alerts| alerts.current().is_some())
                .unwrap_or(false);
            self.visits.lock().push((path.to_string(), still_visible));
        }
    }

    fn setup(duration: Duration) -> (AlertCenter, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator {
            alerts: Mutex::new(None),
            visits: Mutex::new(Vec::new()),
        });
        let alerts = AlertCenter::new(duration, Theme::default(), navigator.clone());
        *navigator.alerts.lock() = Some(alerts.clone());
        (alerts, navigator)
    }

    fn post_notification() -> Notification {
        Notification {
            id: "n1".to_string(),
            sender: Some(NotificationSender {
                id: "u1".to_string(),
                user_name: "alice".to_string(),
                display_name: None,
                avatar: None,
            }),
            message: "liked your post".to_string(),
            post: Some("p1".to_string()),
            video: None,
        }
    }

    #[test]
    fn test_click_dismisses_before_navigating() {
        let (alerts, navigator) = setup(Duration::from_secs(5));
        let id = alerts.raise(post_notification());
        assert_eq!(alerts.current().unwrap().title, "alice: liked your post");

        assert_eq!(alerts.handle(id, AlertGesture::Body).as_deref(), Some("/user/alice/post/p1"));
        assert!(alerts.current().is_none());

        // 再次点击同一条提醒不会重复跳转
        assert!(alerts.click(id).is_none());
        assert_eq!(
            *navigator.visits.lock(),
            vec![("/user/alice/post/p1".to_string(), false)]
        );
    }

    #[test]
    fn test_close_button_never_navigates() {
        let (alerts, navigator) = setup(Duration::from_secs(5));
        let id = alerts.raise(post_notification());

        assert!(alerts.handle(id, AlertGesture::CloseButton).is_none());
        assert!(alerts.current().is_none());
        assert!(alerts.click(id).is_none());
        assert!(navigator.visits.lock().is_empty());
    }

    #[test]
    fn test_newer_alert_replaces_older() {
        let (alerts, _) = setup(Duration::from_secs(5));
        let first = alerts.raise(post_notification());
        let second = alerts.raise(post_notification());

        assert!(!alerts.dismiss(first));
        assert_eq!(alerts.current().map(|a| a.id), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_only_hits_its_own_alert() {
        let (alerts, _) = setup(Duration::from_millis(50));
        alerts.raise(post_notification());
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = alerts.raise(post_notification());

        // 第一条的计时到期，不应关闭第二条
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(alerts.current().map(|a| a.id), Some(second));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(alerts.current().is_none());
    }
}
