pub mod annotation;
pub mod ir;
pub mod migrate;
pub mod mock;
pub mod observed;
pub mod reconcile;
pub mod validate;

use once_cell::sync::Lazy;
use regex::Regex;

/// 合法的表/列/索引标识符。 拼接 SQL 前必须先通过该校验
pub static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// 标识符加反引号
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name)
}

pub fn is_valid_ident(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

#[cfg(test)]
mod test {
    use crate::{is_valid_ident, quote_ident};

    #[test]
    fn test_ident() {
        assert!(is_valid_ident("users"));
        assert!(is_valid_ident("_tmp_2024"));
        assert!(!is_valid_ident("2users"));
        assert!(!is_valid_ident("users; drop"));
        assert!(!is_valid_ident("us`ers"));
        assert!(!is_valid_ident(""));

        assert_eq!(quote_ident("users"), "`users`");
    }
}
