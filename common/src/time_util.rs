use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;

/// 获取当前时间的秒数
pub fn now() -> u64 {
    let now = SystemTime::now();

    let duration_since_epoch = now.duration_since(UNIX_EPOCH).expect("Time went backwards");

    return duration_since_epoch.as_secs();
}

/// 获取当前时间的格式化输出
pub fn now_str() -> String {
    let chrono_time = Local::now();

    return chrono_time.format("%Y-%m-%d %H:%M:%S").to_string();
}

/// 导出文件名中使用的时间戳, 如 2024-01-31_093005
pub fn now_file_str() -> String {
    let chrono_time = Local::now();

    return chrono_time.format("%Y-%m-%d_%H%M%S").to_string();
}
