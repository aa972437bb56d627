use std::fmt::Debug;
use std::time::Duration;

use byte_unit::{Byte, UnitType};
use pretty_duration::pretty_duration;
use serde::Serialize;

use crate::config::load_style::Format;

/// Duration 的格式化输出
pub fn to_duration_pretty(duration: &Duration) -> String {
    pretty_duration(duration, None)
}

/// 执行耗时的格式化输出。 1s 以内输出毫秒数, 否则输出秒/分钟
pub fn to_elapsed_pretty(duration: &Duration) -> String {
    if duration.as_secs() < 1 {
        return format!("{} ms", duration.as_millis());
    }

    to_duration_pretty(duration)
}

/// 字节大小 的格式化输出
pub fn to_bytes_len_pretty(len: usize) -> String {
    let byte = Byte::from_u128(len as u128).unwrap();
    let adjusted_byte = byte.get_appropriate_unit(UnitType::Decimal);

    format!("{adjusted_byte:.2}")
}

pub fn to_string_pretty<T: Sized + Serialize + Debug>(f: &Format, val: &T) -> String {
    match f {
        Format::Json => {
            let serde_json = serde_json::to_string_pretty(val);

            match serde_json {
                Ok(v) => v,
                Err(_e) => {
                    format!("to_string_pretty Json error:{:?}", val)
                }
            }
        }
        Format::Yaml => {
            let serde_yaml = serde_yaml::to_string(val);

            match serde_yaml {
                Ok(v) => v,
                Err(_e) => {
                    format!("to_string_pretty Yaml error:{:?}", val)
                }
            }
        }
        Format::None => {
            format!("{:?}", val)
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::pretty_util::{to_bytes_len_pretty, to_elapsed_pretty};

    #[test]
    fn test_elapsed() {
        assert_eq!(to_elapsed_pretty(&Duration::from_millis(358)), "358 ms");

        let s = to_elapsed_pretty(&Duration::from_secs(75));
        assert!(s.contains("1m"), "{}", s);
    }

    #[test]
    fn test_bytes() {
        let s = to_bytes_len_pretty(2_500_000);
        assert!(s.starts_with("2.50"), "{}", s);
    }
}
