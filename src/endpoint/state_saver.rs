//! StateSaver: 后台防抖持久化 actor
//!
//! 通过 channel 接收保存信号，500ms 防抖窗口内合并多次请求为一次磁盘写入，
//! 避免在 async WebSocket 处理循环中同步阻塞 tokio 线程。

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::state::SharedRegistry;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Start the registry saver and return the sender that triggers a save.
///
/// Every `()` sent means "the registry changed". Signals arriving within the
/// debounce window are merged; the write itself runs on `spawn_blocking`.
/// A final save happens when every sender is dropped.
pub fn spawn_state_saver(registry: SharedRegistry, path: PathBuf) -> mpsc::Sender<()> {
    let (tx, mut rx) = mpsc::channel::<()>(32);

    tokio::spawn(async move {
        loop {
            if rx.recv().await.is_none() {
                do_save(&registry, &path).await;
                info!("StateSaver: channel closed, final save done");
                return;
            }

            // 防抖窗口：窗口内收到新信号则重置计时器
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(DEBOUNCE_WINDOW) => break,
                    result = rx.recv() => {
                        if result.is_none() {
                            do_save(&registry, &path).await;
                            info!("StateSaver: channel closed during debounce, final save done");
                            return;
                        }
                    }
                }
            }

            do_save(&registry, &path).await;
        }
    });

    tx
}

/// 短暂持锁 clone 注册表，然后在 spawn_blocking 中写入磁盘
async fn do_save(registry: &SharedRegistry, path: &Path) {
    let mut shared = registry.write().await;
    // 内存中的注册表与快照使用同一个 last_updated
    shared.last_updated = Some(chrono::Utc::now());
    let snapshot = shared.clone();
    drop(shared);
    let path = path.to_path_buf();

    let result = tokio::task::spawn_blocking(move || snapshot.write_to(&path)).await;

    match result {
        Ok(Ok(())) => {
            info!("Endpoint registry saved to disk (debounced)");
        }
        Ok(Err(e)) => {
            error!("StateSaver: failed to write registry: {}", e);
        }
        Err(e) => {
            error!("StateSaver: spawn_blocking panicked: {}", e);
        }
    }
}
