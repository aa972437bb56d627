/// 文本协议的一行查询结果。 NULL 值为 None。
#[derive(Debug, Clone, PartialEq)]
pub struct RowString {
    values: Vec<Option<String>>,
}

impl RowString {
    /// Creates `RowString` from cell values.
    pub fn new_row(values: Vec<Option<String>>) -> Self {
        RowString { values }
    }

    /// Returns length of a row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has a length of 0.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<String>] {
        self.values.as_slice()
    }

    /// 取某一列的值, 越界或者 NULL 时返回 None
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// 取某一列的值, NULL 时返回空串
    pub fn get_or_empty(&self, index: usize) -> &str {
        self.get(index).unwrap_or("")
    }

    pub fn into_values(self) -> Vec<Option<String>> {
        self.values
    }
}
