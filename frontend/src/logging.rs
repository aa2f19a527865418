//! 日志初始化
//!
//! `tracing` 事件格式化后写入浏览器控制台。浏览器里没有系统时钟，
//! 所以关闭时间戳；控制台不识别 ANSI 转义，所以关闭颜色。

use std::io;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// 缓冲一条日志，drop 时整行写入控制台
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let msg = wasm_bindgen::JsValue::from_str(line);
        match self.level {
            Level::ERROR => web_sys::console::error_1(&msg),
            Level::WARN => web_sys::console::warn_1(&msg),
            Level::INFO => web_sys::console::info_1(&msg),
            _ => web_sys::console::debug_1(&msg),
        }
    }
}

#[derive(Clone, Copy, Default)]
pub struct MakeConsoleWriter;

impl<'a> MakeWriter<'a> for MakeConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// 安装全局 subscriber；debug 构建输出 DEBUG 级别
pub fn init() {
    let max_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let result = tracing_subscriber::fmt()
        .with_writer(MakeConsoleWriter)
        .with_max_level(max_level)
        .with_ansi(false)
        .without_time()
        .try_init();

    if let Err(e) = result {
        web_sys::console::warn_1(&format!("logging already initialised: {}", e).into());
    }
}
