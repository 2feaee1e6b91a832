use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::endpoint::config::home_dir;

/// 全局日志写入器单例
static FILE_LOGGER: std::sync::OnceLock<FileLogger> = std::sync::OnceLock::new();

/// JSON 日志条目
#[derive(Debug, Serialize)]
struct LogRecord {
    ts: String,
    level: String,
    target: String,
    msg: String,
}

/// 内部状态，由 Mutex 保护
struct LogFileState {
    writer: Option<BufWriter<File>>,
    current_date: Option<NaiveDate>,
}

/// 线程安全的日志文件写入器
///
/// 按日期创建 `~/.gitroute/logs/YYYY-MM-DD.log`，
/// 每行写入一条 JSON 结构化日志。
pub struct FileLogger {
    log_dir: PathBuf,
    state: Mutex<LogFileState>,
}

impl FileLogger {
    /// 获取全局单例
    pub fn global() -> &'static FileLogger {
        FILE_LOGGER.get_or_init(|| FileLogger::new(home_dir().join("logs")))
    }

    pub(crate) fn new(log_dir: PathBuf) -> Self {
        // 确保日志目录存在
        let _ = fs::create_dir_all(&log_dir);
        Self {
            log_dir,
            state: Mutex::new(LogFileState {
                writer: None,
                current_date: None,
            }),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// 写入一条服务自身的日志
    pub fn write_core_log(&self, level: &str, target: &str, message: &str) {
        let record = LogRecord {
            ts: Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            level: level.to_string(),
            target: target.to_string(),
            msg: message.to_string(),
        };
        self.write_record(&record);
    }

    /// 清理超过保留天数的日志文件，返回删除的文件数
    pub fn cleanup_old_logs(&self, retention_days: u32) -> usize {
        let cutoff = Local::now().date_naive() - chrono::Duration::days(i64::from(retention_days));
        let entries = match fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            // 从文件名解析日期：YYYY-MM-DD.log
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(date) = NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
                    if date < cutoff && fs::remove_file(&path).is_ok() {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    // ---- 内部方法 ----

    fn write_record(&self, record: &LogRecord) {
        let today = Local::now().date_naive();
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(_) => return,
        };

        // 日期切换时重新打开文件
        if state.current_date != Some(today) {
            state.writer = None;
            state.current_date = None;
            if let Some(w) = self.open_log_file(today) {
                state.writer = Some(w);
                state.current_date = Some(today);
            }
        }

        if let Some(ref mut writer) = state.writer {
            if let Ok(json) = serde_json::to_string(record) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn open_log_file(&self, date: NaiveDate) -> Option<BufWriter<File>> {
        let filename = format!("{}.log", date.format("%Y-%m-%d"));
        let path = self.log_dir.join(filename);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
            .map(BufWriter::new)
    }
}
