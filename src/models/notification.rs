use serde::{Deserialize, Serialize};

use crate::utils::serde_helpers::content_ref;

/// 推送通道收到的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub sender: Option<NotificationSender>,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "content_ref", skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    #[serde(default, with = "content_ref", skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

/// 通知发起人，服务端可能只给出部分字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSender {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// 通知关联的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTarget {
    Post(String),
    Video(String),
}

impl Notification {
    /// 通知关联的内容，post 优先于 video
    pub fn content(&self) -> Option<ContentTarget> {
        match (&self.post, &self.video) {
            (Some(post), _) => Some(ContentTarget::Post(post.clone())),
            (None, Some(video)) => Some(ContentTarget::Video(video.clone())),
            (None, None) => None,
        }
    }

    /// 点击提醒时的跳转路径
    /// 没有发起人用户名或没有关联内容时不跳转
    pub fn target_path(&self) -> Option<String> {
        let sender = self.sender.as_ref().filter(|s| !s.user_name.is_empty())?;
        let user = urlencoding::encode(&sender.user_name);

        match self.content()? {
            ContentTarget::Post(id) => Some(format!("/user/{}/post/{}", user, urlencoding::encode(&id))),
            ContentTarget::Video(id) => Some(format!("/user/{}/video/{}", user, urlencoding::encode(&id))),
        }
    }

    /// 提醒里显示的发起人名称
    pub fn sender_label(&self) -> Option<&str> {
        let sender = self.sender.as_ref()?;
        sender
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| Some(sender.user_name.as_str()).filter(|name| !name.is_empty()))
    }
}
