mod config;

use config::DaemonConfig;
use log::LevelFilter;
use serde::Deserialize;
use sotto_api::types::{ClientEvent, ServerEvent, UserId};
use sotto_relay::storage::{InMemoryFriendshipStore, InMemoryKeyDirectory, InMemoryMessageStore};
use sotto_relay::RelayNode;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::mpsc;

/// First line of every connection; everything after it is `ClientEvent`
/// frames.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthFrame {
    token: String,
}

#[derive(thiserror::Error, Debug)]
enum DaemonError {
    #[error("config")]
    Config,
    #[error("bind")]
    Bind,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let args: Vec<String> = std::env::args().collect();
    let mut path = PathBuf::from("sotto.toml");
    let mut i = 1;
    while i + 1 < args.len() {
        if args[i] == "--config" {
            path = PathBuf::from(&args[i + 1]);
        }
        i += 1;
    }
    let cfg = config::load_config(&path).map_err(|_| DaemonError::Config)?;
    init_logging(&cfg);
    let node = build_node(&cfg).await;
    let auth: Arc<HashMap<String, String>> = Arc::new(
        cfg.auth
            .iter()
            .map(|entry| (entry.token.clone(), entry.user_id.clone()))
            .collect(),
    );

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .map_err(|_| DaemonError::Bind)?;
    log::info!("listening on {}", cfg.listen_addr);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("shutting down");
                break;
            }
            res = listener.accept() => {
                match res {
                    Ok((stream, addr)) => {
                        let node = node.clone();
                        let auth = auth.clone();
                        let capacity = cfg.queue_capacity;
                        tokio::spawn(async move {
                            serve_connection(node, auth, capacity, stream, addr).await;
                        });
                    }
                    Err(err) => {
                        log::error!("accept failed: {}", err);
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

fn init_logging(cfg: &DaemonConfig) {
    let level = match cfg.logging.level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

/// In-memory stores seeded from the config; the durable versions live
/// behind the same traits in the account service.
async fn build_node(cfg: &DaemonConfig) -> RelayNode {
    let friends = Arc::new(InMemoryFriendshipStore::new());
    for entry in &cfg.friendships {
        friends
            .accept(&UserId::new(entry.a.as_str()), &UserId::new(entry.b.as_str()))
            .await;
    }
    let keys = Arc::new(InMemoryKeyDirectory::new());
    for entry in &cfg.keys {
        keys.register(
            &UserId::new(entry.user_id.as_str()),
            entry.public_key_jwk.clone(),
        )
        .await;
    }
    let store = Arc::new(InMemoryMessageStore::new());
    RelayNode::new(friends, store, keys)
}

async fn serve_connection(
    node: RelayNode,
    auth: Arc<HashMap<String, String>>,
    capacity: usize,
    stream: TcpStream,
    addr: SocketAddr,
) {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let first = match lines.next_line().await {
        Ok(Some(line)) => line,
        _ => return,
    };
    let user = serde_json::from_str::<AuthFrame>(&first)
        .ok()
        .and_then(|frame| auth.get(&frame.token).cloned())
        .map(UserId::new);
    let Some(user) = user else {
        log::warn!("rejected connection from {}", addr);
        let frame = ServerEvent::Error {
            code: "unauthorized".to_string(),
            message: "unauthorized".to_string(),
        };
        let _ = write_frame(&mut writer, &frame).await;
        return;
    };

    let (tx, mut rx) = mpsc::channel(capacity);
    let conn = match node.connect(&user, tx.clone()).await {
        Ok(conn) => conn,
        Err(err) => {
            let _ = write_frame(&mut writer, &err.to_event()).await;
            return;
        }
    };
    log::info!("{} connected as {} ({})", addr, user, conn);

    // Single writer per socket: queued fan-out events and request acks
    // both travel through the connection's channel.
    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if write_frame(&mut writer, &event).await.is_err() {
                break;
            }
        }
    });

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<ClientEvent>(&line) {
            Ok(event) => match node.handle_event(&user, conn, event).await {
                Ok(ack) => ack,
                Err(err) => Some(err.to_event()),
            },
            Err(_) => Some(ServerEvent::Error {
                code: "invalid_payload".to_string(),
                message: "malformed frame".to_string(),
            }),
        };
        if let Some(frame) = reply {
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    }

    if let Err(err) = node.disconnect(&user, conn).await {
        log::error!("disconnect of {} failed: {}", user, err);
    }
    drop(tx);
    let _ = writer_task.await;
    log::info!("{} disconnected ({})", user, conn);
}

async fn write_frame(writer: &mut OwnedWriteHalf, event: &ServerEvent) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line).await
}
