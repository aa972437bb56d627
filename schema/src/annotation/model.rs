use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use common::err::schema_error::SchemaError;
use common::err::SResult;

/// model 头行, 如 `model Users {`
static MODEL_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^model\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{$").unwrap());

/// 类级键值对, 如 `table = users;`
static ASSIGN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(.+?)\s*;$").unwrap());

/// 属性行, 如 `email;`
static PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*;$").unwrap());

/// 一个 `.model` 文件的原始结构:
/// 类注释块 + 类级键值对 + (属性名, 注释块) 序列。
/// 注解语义不在这一层处理
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub model_name: String,

    /// `table = …;` 的值, 缺省为小写的模型名
    pub table: Option<String>,

    pub timestamps: bool,

    pub class_comment: String,

    pub properties: Vec<(String, String)>,
}

impl ModelSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SResult<ModelSource> {
        let text = std::fs::read_to_string(path.as_ref())?;
        ModelSource::parse(&text)
    }

    pub fn parse(text: &str) -> SResult<ModelSource> {
        let mut model_name: Option<String> = None;
        let mut table: Option<String> = None;
        let mut timestamps = false;
        let mut class_comment = String::new();
        let mut properties: Vec<(String, String)> = Vec::new();

        let mut pending_comment: Vec<String> = Vec::new();
        let mut in_body = false;
        let mut closed = false;

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(comment) = line.strip_prefix("///") {
                pending_comment.push(comment.trim().to_string());
                continue;
            }

            // 普通注释不参与注解
            if line.starts_with("//") {
                continue;
            }

            if !in_body {
                let captures = MODEL_HEADER_RE.captures(line).ok_or_else(|| {
                    SchemaError::invalid_model(
                        "?",
                        None,
                        format!("unexpected line {} before model header: {}", line_no + 1, line),
                    )
                })?;

                model_name = Some(captures[1].to_string());
                class_comment = pending_comment.join("\n");
                pending_comment.clear();
                in_body = true;
                continue;
            }

            let current_model = model_name.as_deref().unwrap_or("?");

            if line == "}" {
                closed = true;
                continue;
            }

            if closed {
                return Err(SchemaError::invalid_model(
                    current_model,
                    None,
                    format!("unexpected line {} after closing brace: {}", line_no + 1, line),
                ));
            }

            if let Some(captures) = ASSIGN_RE.captures(line) {
                let key = captures[1].to_string();
                let value = captures[2].to_string();

                match key.as_str() {
                    "table" => table = Some(value),
                    "timestamps" => {
                        timestamps = match value.as_str() {
                            "true" => true,
                            "false" => false,
                            other => {
                                return Err(SchemaError::invalid_model(
                                    current_model,
                                    None,
                                    format!("timestamps must be true or false, got {}", other),
                                ))
                            }
                        }
                    }
                    other => {
                        return Err(SchemaError::invalid_model(
                            current_model,
                            None,
                            format!("unknown model setting: {}", other),
                        ))
                    }
                }
                pending_comment.clear();
                continue;
            }

            if let Some(captures) = PROPERTY_RE.captures(line) {
                properties.push((captures[1].to_string(), pending_comment.join("\n")));
                pending_comment.clear();
                continue;
            }

            return Err(SchemaError::invalid_model(
                current_model,
                None,
                format!("can not parse line {}: {}", line_no + 1, line),
            ));
        }

        let model_name = model_name.ok_or_else(|| {
            SchemaError::invalid_model("?", None, "no model header found".to_string())
        })?;

        if !closed {
            return Err(SchemaError::invalid_model(
                &model_name,
                None,
                "model body is not closed".to_string(),
            ));
        }

        Ok(ModelSource {
            model_name,
            table,
            timestamps,
            class_comment,
            properties,
        })
    }

    /// 实际的表名。 未显式声明时为小写的模型名
    pub fn table_name(&self) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None => self.model_name.to_lowercase(),
        }
    }
}
