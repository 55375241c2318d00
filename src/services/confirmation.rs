use parking_lot::Mutex;
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, Result},
    models::moderation::{ActionResponse, ContentKind, Subject, SubjectType},
    services::api::ModerationApi,
};

/// 确认流程的阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FirstPrompt,
    SecondPrompt,
    InFlight,
    Done { notice: String },
    Failed { message: String },
}

/// 一次确认操作的结果
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// 当前阶段不接受确认（空闲、请求中或已完成）
    Ignored,
    /// 需要再确认一次
    AwaitingSecondConfirmation,
    /// 操作成功，调用方负责刷新相关列表
    Completed { notice: String, response: ActionResponse },
    Failed { message: String },
}

/// 哪些对象类型需要二次确认
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    escalated: HashSet<SubjectType>,
}

impl ConfirmationPolicy {
    pub fn new(escalated: impl IntoIterator<Item = SubjectType>) -> Self {
        Self {
            escalated: escalated.into_iter().collect(),
        }
    }

    pub fn requires_second_confirmation(&self, subject_type: SubjectType) -> bool {
        self.escalated.contains(&subject_type)
    }

    pub fn required_confirmations(&self, subject_type: SubjectType) -> u8 {
        if self.requires_second_confirmation(subject_type) {
            2
        } else {
            1
        }
    }
}

impl Default for ConfirmationPolicy {
    /// 封禁用户会删除整个账号及其全部内容，需要二次确认
    fn default() -> Self {
        Self::new([SubjectType::User])
    }
}

/// 破坏性操作的确认流程
///
/// 克隆后共享同一份状态，便于界面上多个控件驱动同一个流程。
/// 锁不会跨 await 持有；请求返回后会重新检查阶段，
/// 只有仍处于同一次请求的 `InFlight` 时才写入结果。
#[derive(Clone)]
pub struct ConfirmationFlow {
    api: Arc<dyn ModerationApi>,
    policy: ConfirmationPolicy,
    state: Arc<Mutex<FlowState>>,
}

struct FlowState {
    phase: Phase,
    subject: Option<Subject>,
    attempt: u64,
}

impl ConfirmationFlow {
    pub fn new(api: Arc<dyn ModerationApi>, policy: ConfirmationPolicy) -> Self {
        Self {
            api,
            policy,
            state: Arc::new(Mutex::new(FlowState {
                phase: Phase::Idle,
                subject: None,
                attempt: 0,
            })),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase.clone()
    }

    pub fn subject(&self) -> Option<Subject> {
        self.state.lock().subject.clone()
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// 请求进行中，确认按钮应禁用并显示加载状态
    pub fn is_busy(&self) -> bool {
        self.state.lock().phase == Phase::InFlight
    }

    /// 用户点击删除/封禁，进入第一次确认
    pub fn open(&self, subject: Subject) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase == Phase::InFlight {
            return Err(AppError::InvalidState(
                "a destructive action is already in flight".to_string(),
            ));
        }

        debug!("Opening confirmation for {}", subject);
        state.phase = Phase::FirstPrompt;
        state.subject = Some(subject);
        Ok(())
    }

    /// 取消按钮
    pub fn cancel(&self) -> bool {
        self.reset("cancel")
    }

    /// 关闭弹窗或离开页面
    pub fn close(&self) -> bool {
        self.reset("close")
    }

    /// 确认成功提示后回到空闲
    pub fn acknowledge(&self) -> bool {
        self.reset_from(|phase| matches!(phase, Phase::Done { .. }), "acknowledge")
    }

    /// 关闭失败提示后回到空闲
    pub fn dismiss(&self) -> bool {
        self.reset_from(|phase| matches!(phase, Phase::Failed { .. }), "dismiss")
    }

    /// 当前阶段要展示的提示文案
    pub fn prompt(&self) -> Option<String> {
        let state = self.state.lock();
        let subject = state.subject.as_ref()?;

        match &state.phase {
            Phase::FirstPrompt => Some(format!(
                "{} {}? This cannot be undone.",
                subject.action_label(),
                subject.id()
            )),
            Phase::SecondPrompt => Some(format!(
                "This will permanently erase {} and all of their posts, videos and media. Are you absolutely sure?",
                subject.id()
            )),
            Phase::InFlight => Some(format!("{} in progress...", subject.action_label())),
            Phase::Done { notice } => Some(notice.clone()),
            Phase::Failed { message } => Some(message.clone()),
            Phase::Idle => None,
        }
    }

    /// 用户点击确认
    pub async fn confirm(&self) -> FlowOutcome {
        let (subject, attempt) = {
            let mut state = self.state.lock();
            let Some(subject) = state.subject.clone() else {
                return FlowOutcome::Ignored;
            };

            match state.phase {
                Phase::FirstPrompt
                    if self.policy.requires_second_confirmation(subject.subject_type()) =>
                {
                    debug!("Escalating confirmation for {}", subject);
                    state.phase = Phase::SecondPrompt;
                    return FlowOutcome::AwaitingSecondConfirmation;
                }
                Phase::FirstPrompt | Phase::SecondPrompt | Phase::Failed { .. } => {
                    state.phase = Phase::InFlight;
                    state.attempt += 1;
                    (subject, state.attempt)
                }
                Phase::Idle | Phase::InFlight | Phase::Done { .. } => {
                    debug!("Ignoring confirm in phase {:?}", state.phase);
                    return FlowOutcome::Ignored;
                }
            }
        };

        info!("Executing {} (attempt {})", subject, attempt);
        let mut guard = InFlightGuard { state: Some(self.state.clone()), attempt };
        let result = execute(self.api.as_ref(), &subject).await;
        guard.disarm();

        let mut state = self.state.lock();
        if state.phase != Phase::InFlight || state.attempt != attempt {
            warn!("Discarding stale response for {}", subject);
            return FlowOutcome::Ignored;
        }

        match result {
            Ok(response) if response.success => {
                let notice = subject.success_notice(&response);
                info!("{} completed: {}", subject, notice);
                state.phase = Phase::Done { notice: notice.clone() };
                FlowOutcome::Completed { notice, response }
            }
            Ok(response) => {
                let message = response
                    .error
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("{} failed", subject.action_label()));
                warn!("{} rejected: {}", subject, message);
                state.phase = Phase::Failed { message: message.clone() };
                FlowOutcome::Failed { message }
            }
            Err(e) => {
                warn!("{} failed: {}", subject, e);
                let message = e.user_message();
                state.phase = Phase::Failed { message: message.clone() };
                FlowOutcome::Failed { message }
            }
        }
    }

    fn reset(&self, reason: &str) -> bool {
        self.reset_from(|phase| *phase != Phase::InFlight, reason)
    }

    fn reset_from(&self, allowed: impl Fn(&Phase) -> bool, reason: &str) -> bool {
        let mut state = self.state.lock();
        if !allowed(&state.phase) {
            debug!("Ignoring {} in phase {:?}", reason, state.phase);
            return false;
        }

        state.phase = Phase::Idle;
        state.subject = None;
        true
    }
}

/// `confirm()` 的 future 在请求返回前被丢弃时（离开页面、超时），
/// 把仍属于这次请求的 `InFlight` 复位为空闲
struct InFlightGuard {
    state: Option<Arc<Mutex<FlowState>>>,
    attempt: u64,
}

impl InFlightGuard {
    fn disarm(&mut self) {
        self.state = None;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        let mut state = state.lock();
        if state.phase == Phase::InFlight && state.attempt == self.attempt {
            warn!("Confirmation abandoned while in flight (attempt {})", self.attempt);
            state.phase = Phase::Idle;
            state.subject = None;
        }
    }
}

/// 按对象类型调用对应的破坏性接口
pub async fn execute(api: &dyn ModerationApi, subject: &Subject) -> Result<ActionResponse> {
    match subject {
        Subject::Account { user_name } | Subject::User { user_name } => {
            api.delete_account(user_name).await
        }
        Subject::Post { post_id, owner_id } => {
            api.delete_content(ContentKind::Post, post_id, owner_id).await
        }
        Subject::Video { video_id, owner_id } => {
            api.delete_content(ContentKind::Video, video_id, owner_id).await
        }
        Subject::Report { report_id } => api.delete_report(report_id).await,
    }
}
