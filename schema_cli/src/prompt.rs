use std::io::Write;

pub fn line(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("   {}", message);
}

pub fn success(message: &str) {
    println!("ok {}", message);
}

pub fn warn(message: &str) {
    println!("!! {}", message);
}

pub fn error_line(message: &str) {
    eprintln!("error: {}", message);
}

/// y/N 确认, 默认否
pub fn confirm(message: &str) -> bool {
    print!("{} [y/N] ", message);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn ask(message: &str) -> String {
    print!("{} ", message);
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    let _ = std::io::stdin().read_line(&mut answer);
    answer.trim().to_string()
}
