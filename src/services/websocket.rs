use crate::{
    config::Config,
    error::{AppError, Result},
    models::websocket::*,
    services::transport::PushTransport,
    utils::emitter::EventEmitter,
};
use futures::{sink::SinkExt, stream::StreamExt};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

static SHARED_TRANSPORT: OnceCell<Arc<WebSocketTransport>> = OnceCell::new();

/// 基于WebSocket的推送通道
///
/// 后台任务独占socket，负责读写和断线重连；
/// 出站帧经由无界队列交给后台任务发送。
pub struct WebSocketTransport {
    url: String,
    reconnect_delay: Duration,
    connected: Arc<AtomicBool>,
    started: AtomicBool,
    events: Arc<EventEmitter<TransportEvent>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
}

/// 单次连接结束的原因
enum PumpExit {
    /// 连接断开，需要重连
    Dropped(String),
    /// 传输层已被释放，后台任务退出
    Shutdown,
}

impl WebSocketTransport {
    pub fn new(url: &str, reconnect_delay: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            url: url.to_string(),
            reconnect_delay,
            connected: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            events: Arc::new(EventEmitter::new()),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    /// 进程级共享的推送通道，首次调用时创建，之后复用
    pub fn shared(config: &Config) -> Arc<WebSocketTransport> {
        SHARED_TRANSPORT
            .get_or_init(|| {
                info!("Creating shared push transport for {}", config.push_url);
                Arc::new(WebSocketTransport::new(&config.push_url, config.reconnect_delay()))
            })
            .clone()
    }

    /// 连接、收发、断线后按固定间隔重连
    async fn run(
        url: String,
        reconnect_delay: Duration,
        connected: Arc<AtomicBool>,
        events: Arc<EventEmitter<TransportEvent>>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
    ) {
        loop {
            match connect_async(url.as_str()).await {
                Ok((socket, _response)) => {
                    // 断线期间残留的帧属于上一次连接
                    while outbound_rx.try_recv().is_ok() {}

                    connected.store(true, Ordering::SeqCst);
                    info!("Push channel connected: {}", url);
                    events.emit(&TransportEvent::Connected);

                    let exit = Self::pump(socket, &mut outbound_rx, &events).await;
                    connected.store(false, Ordering::SeqCst);

                    match exit {
                        PumpExit::Dropped(reason) => {
                            warn!("Push channel disconnected: {}", reason);
                            events.emit(&TransportEvent::Disconnected { reason });
                        }
                        PumpExit::Shutdown => {
                            info!("Push channel shut down: {}", url);
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("Push channel connect to {} failed: {}", url, e);
                }
            }

            debug!("Reconnecting push channel in {:?}", reconnect_delay);
            tokio::time::sleep(reconnect_delay).await;
        }
    }

    async fn pump(
        socket: Socket,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        events: &EventEmitter<TransportEvent>,
    ) -> PumpExit {
        let (mut ws_tx, mut ws_rx) = socket.split();

        loop {
            tokio::select! {
                outgoing = outbound_rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = ws_tx.send(Message::Text(text)).await {
                            error!("Failed to send push frame: {}", e);
                            return PumpExit::Dropped(e.to_string());
                        }
                    }
                    None => {
                        let _ = ws_tx.close().await;
                        return PumpExit::Shutdown;
                    }
                },
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => match PushFrame::decode(&text) {
                        Ok(frame) => {
                            debug!("Received push frame: {}", frame.event);
                            events.emit(&TransportEvent::Frame(frame));
                        }
                        Err(e) => warn!("Ignoring undecodable push frame: {}", e),
                    },
                    Some(Ok(Message::Binary(data))) => {
                        debug!("Ignoring binary push frame of {} bytes", data.len());
                    }
                    Some(Ok(Message::Close(_))) => {
                        return PumpExit::Dropped("closed by server".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return PumpExit::Dropped(e.to_string()),
                    None => return PumpExit::Dropped("stream ended".to_string()),
                },
            }
        }
    }
}

impl PushTransport for WebSocketTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn open(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Push channel already started");
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot open push channel outside of a runtime: {}", e);
                self.started.store(false, Ordering::SeqCst);
                return;
            }
        };

        let Some(outbound_rx) = self.outbound_rx.lock().take() else {
            return;
        };

        runtime.spawn(Self::run(
            self.url.clone(),
            self.reconnect_delay,
            self.connected.clone(),
            self.events.clone(),
            outbound_rx,
        ));
    }

    fn send(&self, event: &OutboundEvent) -> Result<()> {
        if !self.is_connected() {
            return Err(AppError::NotConnected);
        }

        let text = event.to_frame()?.encode()?;
        self.outbound_tx
            .send(text)
            .map_err(|_| AppError::Transport("push channel task stopped".to_string()))?;

        debug!("Queued outbound push event: {}", event.name());
        Ok(())
    }

    fn events(&self) -> &EventEmitter<TransportEvent> {
        &self.events
    }
}
