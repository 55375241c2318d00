use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// 破坏性操作的对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// 当前登录用户自己的账号（设置页）
    Account,
    /// 被举报/封禁的其他用户账号（管理后台）
    User,
    Post,
    Video,
    Report,
}

/// 破坏性操作的对象，携带各接口需要的ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Account { user_name: String },
    User { user_name: String },
    Post { post_id: String, owner_id: String },
    Video { video_id: String, owner_id: String },
    Report { report_id: String },
}

/// 可被删除的内容类型，对应 /{contentType}s/ 接口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Video => "video",
        }
    }
}

/// 破坏性接口的统一返回格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_media: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Account => "account",
            SubjectType::User => "user",
            SubjectType::Post => "post",
            SubjectType::Video => "video",
            SubjectType::Report => "report",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "account" => Ok(SubjectType::Account),
            "user" => Ok(SubjectType::User),
            "post" => Ok(SubjectType::Post),
            "video" => Ok(SubjectType::Video),
            "report" => Ok(SubjectType::Report),
            other => Err(format!("unknown subject type: {}", other)),
        }
    }
}

impl Subject {
    pub fn subject_type(&self) -> SubjectType {
        match self {
            Subject::Account { .. } => SubjectType::Account,
            Subject::User { .. } => SubjectType::User,
            Subject::Post { .. } => SubjectType::Post,
            Subject::Video { .. } => SubjectType::Video,
            Subject::Report { .. } => SubjectType::Report,
        }
    }

    /// 对象的主ID
    pub fn id(&self) -> &str {
        match self {
            Subject::Account { user_name } | Subject::User { user_name } => user_name,
            Subject::Post { post_id, .. } => post_id,
            Subject::Video { video_id, .. } => video_id,
            Subject::Report { report_id } => report_id,
        }
    }

    /// 操作名称，用于提示文案
    pub fn action_label(&self) -> &'static str {
        match self {
            Subject::Account { .. } => "Delete account",
            Subject::User { .. } => "Ban and erase user",
            Subject::Post { .. } => "Delete post",
            Subject::Video { .. } => "Delete video",
            Subject::Report { .. } => "Delete report",
        }
    }

    /// 操作成功后的提示
    pub fn success_notice(&self, response: &ActionResponse) -> String {
        match self {
            Subject::Account { user_name } | Subject::User { user_name } => {
                match response.deleted_media {
                    Some(count) => format!(
                        "Account {} deleted along with {} media file{}",
                        user_name,
                        count,
                        if count == 1 { "" } else { "s" }
                    ),
                    None => format!("Account {} deleted", user_name),
                }
            }
            Subject::Post { post_id, .. } => format!("Post {} removed", post_id),
            Subject::Video { video_id, .. } => format!("Video {} removed", video_id),
            Subject::Report { report_id } => format!("Report {} deleted", report_id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type(), self.id())
    }
}
