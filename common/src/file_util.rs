use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::err::SResult;

/// 确保目录存在, 返回目录路径
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> SResult<PathBuf> {
    let path = dir.as_ref();
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// 创建可写的导出文件, 已存在时覆盖
pub fn create_file<P: AsRef<Path>>(path: P) -> SResult<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_dir(parent)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path.as_ref())?;
    Ok(BufWriter::new(file))
}

/// 打开只读文件
pub fn open_file<P: AsRef<Path>>(path: P) -> SResult<BufReader<File>> {
    let file = File::open(path.as_ref())?;
    Ok(BufReader::new(file))
}
