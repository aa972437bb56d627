use serde::Serialize;

use crate::quote_ident;

/// 分区方式。 RANGE/LIST 解析接受, 但生成 DDL 时拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PartitionKind {
    Hash,
    Key,
    Range,
    List,
}

impl PartitionKind {
    pub fn parse(value: &str) -> Option<PartitionKind> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HASH" => Some(PartitionKind::Hash),
            "KEY" => Some(PartitionKind::Key),
            "RANGE" => Some(PartitionKind::Range),
            "LIST" => Some(PartitionKind::List),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            PartitionKind::Hash => "HASH",
            PartitionKind::Key => "KEY",
            PartitionKind::Range => "RANGE",
            PartitionKind::List => "LIST",
        }
    }

    /// 生成器只支持 HASH/KEY
    pub fn supported_by_generator(&self) -> bool {
        matches!(self, PartitionKind::Hash | PartitionKind::Key)
    }

    /// HASH/KEY 必须带分区数
    pub fn requires_count(&self) -> bool {
        self.supported_by_generator()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionDef {
    pub kind: PartitionKind,
    pub column: String,
    pub count: u32,
}

impl PartitionDef {
    /// PARTITION BY 子句, 不含 ALTER TABLE 前缀
    pub fn render(&self) -> String {
        format!(
            "PARTITION BY {}({}) PARTITIONS {}",
            self.kind.as_sql(),
            quote_ident(&self.column),
            self.count
        )
    }
}
