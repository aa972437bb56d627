use std::io;
use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::declar::auth_plugin_names::AuthPlugin;
use crate::{NULL_TERMINATOR, RESULT_SET_NULL};

pub fn write_null_term_string(
    cursor: &mut Cursor<&mut Vec<u8>>,
    str: &String,
) -> Result<(), io::Error> {
    cursor.write(str.as_bytes())?;
    cursor.write_u8(NULL_TERMINATOR)?;

    Ok(())
}

/// 读取 length-encoded integer, 返回 (头字节, 值)
pub fn read_len_enc_num(cursor: &mut Cursor<&[u8]>) -> SResult<(u8, u64)> {
    let first = cursor.read_u8()?;

    let value = match first {
        // 0xfb 为 NULL, 0xff 为 ERR, 都不应出现在这里
        0xfc => cursor.read_u16::<LittleEndian>()? as u64,
        0xfd => cursor.read_u24::<LittleEndian>()? as u64,
        0xfe => cursor.read_u64::<LittleEndian>()?,
        _ if first < 0xfb => first as u64,
        _ => {
            return Err(SchemaError::String(format!(
                "unexpected length-encoded integer header: 0x{:02x}",
                first
            )))
        }
    };

    Ok((first, value))
}

/// 读取 length-encoded string
pub fn read_len_enc_str(cursor: &mut Cursor<&[u8]>) -> SResult<String> {
    let (_, len) = read_len_enc_num(cursor)?;

    let mut buffer = vec![0u8; len as usize];
    cursor.read_exact(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// 读取 length-encoded string, 0xfb 表示 NULL
pub fn read_len_enc_str_allow_null(cursor: &mut Cursor<&[u8]>) -> SResult<Option<String>> {
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if remaining == 0 {
        return Ok(None);
    }

    if cursor.get_ref()[cursor.position() as usize] == RESULT_SET_NULL {
        cursor.read_u8()?;
        return Ok(None);
    }

    Ok(Some(read_len_enc_str(cursor)?))
}

/// 读取 null-terminated string
pub fn read_null_term_string(cursor: &mut Cursor<&[u8]>) -> SResult<String> {
    let mut buffer = Vec::new();
    loop {
        let byte = cursor.read_u8()?;
        if byte == NULL_TERMINATOR {
            break;
        }
        buffer.push(byte);
    }
    Ok(String::from_utf8(buffer)?)
}

/// 读取固定长度 string
pub fn read_fixed_string(cursor: &mut Cursor<&[u8]>, len: usize) -> SResult<String> {
    let mut buffer = vec![0u8; len];
    cursor.read_exact(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// 读取余下的全部字节
pub fn read_rest_string(cursor: &mut Cursor<&[u8]>) -> SResult<String> {
    let mut rest = String::new();
    cursor.read_to_string(&mut rest)?;
    Ok(rest)
}

pub fn encrypt_password(password: &String, scramble: &String, auth_plugin: &AuthPlugin) -> Vec<u8> {
    match auth_plugin {
        AuthPlugin::MySqlNativePassword => {
            let password_hash = sha1(password.as_bytes());
            let concat_hash = [scramble.as_bytes().to_vec(), sha1(&password_hash)].concat();
            xor(&password_hash, &sha1(&concat_hash))
        }
        AuthPlugin::CachingSha2Password => {
            let password_hash = sha256(password.as_bytes());
            let concat_hash = [scramble.as_bytes().to_vec(), sha256(&password_hash)].concat();
            xor(&password_hash, &sha256(&concat_hash))
        }
    }
}

pub fn xor(slice1: &[u8], slice2: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; slice1.len()];
    for i in 0..result.len() {
        result[i] = slice1[i] ^ slice2[i % slice2.len()];
    }
    result
}

pub fn sha1(value: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(value);
    hasher.finalize().as_slice().to_vec()
}

pub fn sha256(value: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(value);
    hasher.finalize().as_slice().to_vec()
}
