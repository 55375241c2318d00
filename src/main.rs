use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time::{interval, Duration},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use social_client::{
    models::moderation::Subject,
    services::{FlowOutcome, LogNavigator, Phase, PushTransport},
    ClientState, Config,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 连接推送通道并打印收到的通知（默认）
    Listen,
    /// 经过确认后执行破坏性操作
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
}

#[derive(Subcommand, Debug)]
enum DeleteTarget {
    /// 删除自己的账号
    Account { user_name: String },
    /// 封禁并删除用户
    User { user_name: String },
    Post { post_id: String, owner_id: String },
    Video { video_id: String, owner_id: String },
    Report { report_id: String },
}

impl From<DeleteTarget> for Subject {
    fn from(target: DeleteTarget) -> Self {
        match target {
            DeleteTarget::Account { user_name } => Subject::Account { user_name },
            DeleteTarget::User { user_name } => Subject::User { user_name },
            DeleteTarget::Post { post_id, owner_id } => Subject::Post { post_id, owner_id },
            DeleteTarget::Video { video_id, owner_id } => Subject::Video { video_id, owner_id },
            DeleteTarget::Report { report_id } => Subject::Report { report_id },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env()?;

    // 初始化日志，生产环境输出JSON
    let production = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(production.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!production).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Starting social client ({})...", config.environment);

    let state = ClientState::new(config, Arc::new(LogNavigator))?;

    match args.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(state).await,
        Command::Delete { target } => delete(state, target.into()).await,
    }
}

async fn listen(state: ClientState) -> anyhow::Result<()> {
    match state.config.session_user_id.clone() {
        Some(user_id) => state.start_session(Some(&user_id))?,
        None => warn!("SESSION_USER_ID not set, waiting without push registration"),
    }

    // 定期输出未读数
    let stats_state = state.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let inbox = stats_state.notifications.inbox();
            info!(
                "Unread notifications: {} (connected: {})",
                inbox.unread_count(),
                stats_state.transport.is_connected()
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    state.end_session();
    Ok(())
}

async fn delete(state: ClientState, subject: Subject) -> anyhow::Result<()> {
    let flow = state.confirmation_flow();
    flow.open(subject)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if let Some(prompt) = flow.prompt() {
            println!("{} [y/N]", prompt);
        }

        let answer = lines.next_line().await?.unwrap_or_default();
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            flow.cancel();
            println!("Cancelled");
            return Ok(());
        }

        match flow.confirm().await {
            FlowOutcome::AwaitingSecondConfirmation => continue,
            FlowOutcome::Completed { notice, .. } => {
                println!("{}", notice);
                flow.acknowledge();
                return Ok(());
            }
            FlowOutcome::Failed { message } => {
                error!("Destructive action failed: {}", message);
                println!("Failed: {} (confirm again to retry)", message);
            }
            FlowOutcome::Ignored => {
                if flow.phase() == Phase::Idle {
                    return Ok(());
                }
            }
        }
    }
}
