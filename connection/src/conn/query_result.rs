use std::io::Cursor;
use std::sync::Arc;

use common::err::schema_error::SchemaError;
use common::err::SResult;
use common::row::row_string::RowString;

use crate::bytes::read_len_enc_num;
use crate::conn::connection::Connection;
use crate::declar::capability_flags;
use crate::packet::end_of_file_packet::EndOfFilePacket;
use crate::packet::response_type::ResponseType;
use crate::packet::result_set_column_packet::ResultSetColumnPacket;
use crate::packet::result_set_row_packet::ResultSetRowPacket;

/// 结果集的列元信息, 只保留本工具需要的字段
#[derive(Debug, Clone)]
pub struct QueryColumn {
    pub name: String,
    pub org_name: String,
    pub character_set: u16,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl QueryColumn {
    /// 仅有列名的元信息, 供测试桩使用
    pub fn named(name: &str) -> Self {
        QueryColumn {
            name: name.to_string(),
            org_name: name.to_string(),
            character_set: 0,
            column_type: 0,
            flags: 0,
            decimals: 0,
        }
    }
}

impl From<ResultSetColumnPacket> for QueryColumn {
    fn from(packet: ResultSetColumnPacket) -> Self {
        QueryColumn {
            name: packet.name,
            org_name: packet.org_name,
            character_set: packet.character_set,
            column_type: packet.column_type,
            flags: packet.flags,
            decimals: packet.decimals,
        }
    }
}

/// 流式的查询结果。 逐行从连接上读取, drop时必须读完剩余行
#[derive(Debug)]
pub struct StreamQueryResult<'a> {
    source: RowSource<'a>,
    columns: Arc<[QueryColumn]>,
    has_results: bool,
}

#[derive(Debug)]
enum RowSource<'a> {
    /// 还在连接上的结果集
    Wire { conn: &'a mut Connection },

    /// 预先准备好的行, 供测试桩使用
    Canned(std::vec::IntoIter<RowString>),
}

impl StreamQueryResult<'_> {
    pub(crate) fn new_wire<'a>(
        conn: &'a mut Connection,
        columns: Arc<[QueryColumn]>,
    ) -> StreamQueryResult<'a> {
        let has_results = columns.len() > 0;
        StreamQueryResult {
            source: RowSource::Wire { conn },
            columns,
            has_results,
        }
    }

    /// 无结果集的语句 (如 OK 响应)
    pub fn empty() -> StreamQueryResult<'static> {
        StreamQueryResult {
            source: RowSource::Canned(Vec::new().into_iter()),
            columns: Vec::new().into(),
            has_results: false,
        }
    }

    /// 预先准备好的结果集, 供测试桩使用
    pub fn from_rows(columns: Vec<QueryColumn>, rows: Vec<RowString>) -> StreamQueryResult<'static> {
        let has_results = columns.len() > 0;
        StreamQueryResult {
            source: RowSource::Canned(rows.into_iter()),
            columns: columns.into(),
            has_results,
        }
    }

    /// 返回结果集的column
    pub fn columns(&self) -> &Arc<[QueryColumn]> {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

impl Iterator for StreamQueryResult<'_> {
    type Item = SResult<RowString>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_results {
            return None;
        }

        match &mut self.source {
            RowSource::Canned(rows) => match rows.next() {
                None => {
                    self.has_results = false;
                    None
                }
                Some(row) => Some(Ok(row)),
            },
            RowSource::Wire { conn } => {
                let (packet, _) = match conn.read_packet() {
                    Ok(packet) => packet,
                    Err(err) => {
                        self.has_results = false;
                        return Some(Err(err));
                    }
                };

                if packet[0] == ResponseType::ERROR {
                    self.has_results = false;
                    return Some(Err(conn.statement_error("result set row", &packet)));
                }

                if EndOfFilePacket::is_eof(packet.as_slice()) {
                    self.has_results = false;
                    return None;
                }

                let row = match ResultSetRowPacket::parse(&packet) {
                    Ok(row) => row,
                    Err(err) => {
                        self.has_results = false;
                        return Some(Err(SchemaError::String(format!(
                            "Query result row parse error. msg:{:?}",
                            err
                        ))));
                    }
                };
                Some(Ok(RowString::new_row(row.cells)))
            }
        }
    }
}

/// drop时需要将结果读完
impl Drop for StreamQueryResult<'_> {
    fn drop(&mut self) {
        while self.next().is_some() {}
    }
}

/// 读取 column definition 列表。 first_packet 为含 column_count 的首包
pub fn read_column_set(conn: &mut Connection, first_packet: &[u8]) -> SResult<Vec<QueryColumn>> {
    let mut cursor = Cursor::new(first_packet);
    let column_count = read_len_enc_num(&mut cursor)?.1;

    let mut columns: Vec<QueryColumn> = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        let (packet, _) = conn.read_packet_with_check("Query result column load error.")?;
        let column = ResultSetColumnPacket::parse(packet.as_slice())?;

        columns.push(column.into());
    }

    if !conn.has_capability(capability_flags::CLIENT_DEPRECATE_EOF) {
        // 丢弃 eof packet
        let (_, _) = conn.read_packet_with_check("Query result eof load error.")?;
    }

    Ok(columns)
}

/// 读完并丢弃一个结果集, 返回行数
pub fn drain_result_set(conn: &mut Connection, first_packet: &[u8]) -> SResult<u64> {
    let _columns = read_column_set(conn, first_packet)?;

    let mut count = 0u64;
    loop {
        let (packet, _) = conn.read_packet_with_check("Query result set error.")?;
        if EndOfFilePacket::is_eof(packet.as_slice()) {
            break;
        }
        count += 1;
    }
    Ok(count)
}
