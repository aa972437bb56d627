use std::io::{IsTerminal, Write};

/// 单行刷新的进度输出。
/// stdout 不是终端时退化为逐行输出, 避免弄脏日志文件
#[derive(Debug)]
pub struct Progress {
    label: String,
    single_line: bool,
    dirty: bool,
}

impl Progress {
    pub fn new(label: &str) -> Self {
        Progress {
            label: label.to_string(),
            single_line: std::io::stdout().is_terminal(),
            dirty: false,
        }
    }

    /// 测试用, 强制逐行模式
    pub fn line_mode(label: &str) -> Self {
        Progress {
            label: label.to_string(),
            single_line: false,
            dirty: false,
        }
    }

    pub fn update(&mut self, message: &str) {
        if self.single_line {
            print!("\r{} {}", self.label, message);
            let _ = std::io::stdout().flush();
            self.dirty = true;
        } else {
            println!("{} {}", self.label, message);
        }
    }

    /// 收尾, 补换行
    pub fn finish(&mut self, message: &str) {
        if self.single_line {
            println!("\r{} {}", self.label, message);
            self.dirty = false;
        } else {
            println!("{} {}", self.label, message);
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.dirty {
            println!();
        }
    }
}
