use once_cell::sync::Lazy;
use regex::Regex;

use common::err::schema_error::SchemaError;
use common::err::SResult;

use crate::annotation::model::ModelSource;
use crate::ir::column::{
    ColumnIr, FkAction, ForeignKeyIr, DEFAULT_DECIMAL_LENGTH, DEFAULT_VARCHAR_LENGTH,
};
use crate::ir::index::CompositeIndex;
use crate::ir::partition::{PartitionDef, PartitionKind};
use crate::ir::table::TableIr;
use crate::is_valid_ident;

/// 注释块中的 @token, 参数贪婪匹配到行尾或下一个 @
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z][A-Za-z0-9_]*)").unwrap());

/// `@foreign users(id)` 的参数
static FOREIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)$").unwrap()
});

/// `@composite [name] (c1, c2)` 的参数
static COMPOSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([A-Za-z_][A-Za-z0-9_]*)\s+)?\(([^)]*)\)$").unwrap()
});

/// `@partition hash(col) 16` 的参数
static PARTITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(hash|key|range|list)\s*\(\s*([A-Za-z_][A-Za-z0-9_]*)\s*\)\s*(\d+)?$")
        .unwrap()
});

/// 长度参数, DECIMAL 允许 precision,scale
static LENGTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(,\d+)?$").unwrap());

/// 把注解模型源解析为 schema IR。 语义校验由 validate 模块负责
pub struct AnnotationParser;

impl AnnotationParser {
    pub fn parse_text(text: &str) -> SResult<TableIr> {
        let source = ModelSource::parse(text)?;
        AnnotationParser::parse(&source)
    }

    pub fn parse(source: &ModelSource) -> SResult<TableIr> {
        let table_name = source.table_name();
        if !is_valid_ident(&table_name) {
            return Err(SchemaError::invalid_model(
                &source.model_name,
                None,
                format!("illegal table name: {}", table_name),
            ));
        }

        let mut ir = TableIr::new(&source.model_name, &table_name);
        ir.timestamps = source.timestamps;

        AnnotationParser::apply_class_tokens(&mut ir, source)?;

        for (property, block) in &source.properties {
            if let Some(column) =
                AnnotationParser::parse_property(&source.model_name, property, block)?
            {
                if ir.column(&column.name).is_some() {
                    return Err(SchemaError::invalid_model(
                        &source.model_name,
                        Some(property),
                        "duplicate column".to_string(),
                    ));
                }
                ir.columns.push(column);
            }
        }

        Ok(ir)
    }

    fn apply_class_tokens(ir: &mut TableIr, source: &ModelSource) -> SResult<()> {
        for (token, arg) in lex_annotations(&source.class_comment) {
            match token.as_str() {
                "tablecomment" => {
                    ir.table_comment = Some(strip_quotes(&arg));
                }
                "composite" | "compositeUnique" => {
                    let unique = token == "compositeUnique";
                    let index = parse_composite(&source.model_name, &arg, unique)?;
                    if unique {
                        ir.composite_unique_indexes.push(index);
                    } else {
                        ir.composite_indexes.push(index);
                    }
                }
                "partition" => {
                    ir.partition = Some(parse_partition(&source.model_name, &arg)?);
                }
                other => {
                    return Err(SchemaError::invalid_model(
                        &source.model_name,
                        None,
                        format!("unknown class annotation: @{}", other),
                    ))
                }
            }
        }
        Ok(())
    }

    /// 返回 None 表示该属性不映射为列
    fn parse_property(model: &str, property: &str, block: &str) -> SResult<Option<ColumnIr>> {
        let tokens = lex_annotations(block);
        if tokens.is_empty() {
            return Ok(None);
        }

        if !is_valid_ident(property) {
            return Err(SchemaError::invalid_model(
                model,
                Some(property),
                format!("illegal column name: {}", property),
            ));
        }

        // @drop 短路, 其余注解一律不读
        if tokens.iter().any(|(t, _)| t == "drop") {
            let mut column = ColumnIr::named(property);
            column.drop = true;
            return Ok(Some(column));
        }

        let included = tokens.iter().any(|(t, _)| {
            matches!(t.as_str(), "column" | "rename" | "autonumber" | "uuid")
        });
        if !included {
            return Ok(None);
        }

        let mut column = ColumnIr::named(property);
        let mut on_delete: Option<FkAction> = None;
        let mut on_update: Option<FkAction> = None;

        for (token, arg) in &tokens {
            let arg = arg.as_str();
            match token.as_str() {
                "column" => {}

                // 数值。 整数族不给长度时补缺省显示宽度, 与 @autonumber 的 INT(11) 对齐
                "int" | "bigint" | "tinyint" | "smallint" | "mediumint" | "decimal" | "float"
                | "double" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), arg)?;
                    if column.sql_type == "DECIMAL" && column.length.is_none() {
                        column.length = Some(DEFAULT_DECIMAL_LENGTH.to_string());
                    }
                    if column.length.is_none() {
                        if let Some(width) = default_int_width(&column.sql_type) {
                            column.length = Some(width.to_string());
                        }
                    }
                }

                // 字符串
                "varchar" | "char" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), arg)?;
                    if column.length.is_none() {
                        column.length = Some(DEFAULT_VARCHAR_LENGTH.to_string());
                    }
                }
                "text" | "mediumtext" | "longtext" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), "")?;
                }

                // 日期时间
                "datetime" | "date" | "time" | "timestamp" | "year" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), "")?;
                }

                "enum" | "set" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), "")?;
                    column.values = split_values(arg);
                }

                "json" | "blob" | "mediumblob" | "longblob" | "point" | "geometry"
                | "linestring" | "polygon" => {
                    set_type(model, property, &mut column, &token.to_uppercase(), "")?;
                }

                "boolean" | "bool" => {
                    set_type(model, property, &mut column, "TINYINT", "1")?;
                    column.default = Some("0".to_string());
                }

                "autonumber" => {
                    set_type(model, property, &mut column, "INT", "11")?;
                    column.unsigned = true;
                    column.auto_increment = true;
                    column.primary = true;
                }

                "uuid" => {
                    set_type(model, property, &mut column, "CHAR", "36")?;
                    column.primary = true;
                }

                // 布尔属性
                "primary" => column.primary = true,
                "unique" => column.unique = true,
                "index" => column.index = true,
                "fulltext" => column.fulltext = true,
                "nullable" => column.nullable = true,
                "unsigned" => column.unsigned = true,
                "first" => column.first = true,

                "default" => {
                    if arg.is_empty() {
                        return Err(SchemaError::invalid_model(
                            model,
                            Some(property),
                            "@default requires a value".to_string(),
                        ));
                    }
                    column.default = Some(arg.to_string());
                }

                "comment" => column.comment = Some(strip_quotes(arg)),
                "check" => column.check = Some(arg.to_string()),

                "after" => {
                    if !is_valid_ident(arg) {
                        return Err(SchemaError::invalid_model(
                            model,
                            Some(property),
                            format!("@after expects a column name, got: {}", arg),
                        ));
                    }
                    column.after = Some(arg.to_string());
                }

                "rename" => {
                    if !is_valid_ident(arg) {
                        return Err(SchemaError::invalid_model(
                            model,
                            Some(property),
                            format!("@rename expects the old column name, got: {}", arg),
                        ));
                    }
                    column.rename = Some(arg.to_string());
                }

                "foreign" => {
                    let captures = FOREIGN_RE.captures(arg).ok_or_else(|| {
                        SchemaError::invalid_model(
                            model,
                            Some(property),
                            format!("@foreign expects table(column), got: {}", arg),
                        )
                    })?;
                    column.foreign = Some(ForeignKeyIr::new(&captures[1], &captures[2]));
                }

                "ondelete" | "onupdate" => {
                    let action = FkAction::parse(arg).ok_or_else(|| {
                        SchemaError::invalid_model(
                            model,
                            Some(property),
                            format!("unknown foreign key action: {}", arg),
                        )
                    })?;
                    if token == "ondelete" {
                        on_delete = Some(action);
                    } else {
                        on_update = Some(action);
                    }
                }

                other => {
                    return Err(SchemaError::invalid_model(
                        model,
                        Some(property),
                        format!("unknown annotation: @{}", other),
                    ))
                }
            }
        }

        if column.sql_type.is_empty() {
            return Err(SchemaError::invalid_model(
                model,
                Some(property),
                "no type annotation matched".to_string(),
            ));
        }

        if on_delete.is_some() || on_update.is_some() {
            let foreign = column.foreign.as_mut().ok_or_else(|| {
                SchemaError::invalid_model(
                    model,
                    Some(property),
                    "@ondelete/@onupdate require @foreign".to_string(),
                )
            })?;
            if let Some(action) = on_delete {
                foreign.on_delete = action;
            }
            if let Some(action) = on_update {
                foreign.on_update = action;
            }
        }

        if column.is_enum_like() && column.values.is_empty() {
            return Err(SchemaError::invalid_model(
                model,
                Some(property),
                "enum/set requires a value list".to_string(),
            ));
        }

        Ok(Some(column))
    }
}

/// 逐行扫描注释块, 提取 (token, 参数) 序列。
/// 参数从 token 结束处贪婪匹配到行尾或下一个 @
pub fn lex_annotations(block: &str) -> Vec<(String, String)> {
    let mut tokens = Vec::new();

    for line in block.lines() {
        let matches: Vec<_> = TOKEN_RE.find_iter(line).collect();
        for (i, m) in matches.iter().enumerate() {
            let token = line[m.start() + 1..m.end()].to_string();
            let arg_end = matches
                .get(i + 1)
                .map(|next| next.start())
                .unwrap_or(line.len());
            let arg = line[m.end()..arg_end].trim().to_string();
            tokens.push((token, arg));
        }
    }

    tokens
}

fn set_type(
    model: &str,
    property: &str,
    column: &mut ColumnIr,
    sql_type: &str,
    length_arg: &str,
) -> SResult<()> {
    if !column.sql_type.is_empty() {
        return Err(SchemaError::invalid_model(
            model,
            Some(property),
            format!(
                "conflicting type annotations: {} and {}",
                column.sql_type, sql_type
            ),
        ));
    }

    column.sql_type = sql_type.to_string();

    let length_arg = length_arg.trim();
    if !length_arg.is_empty() {
        if !LENGTH_RE.is_match(length_arg) {
            return Err(SchemaError::invalid_model(
                model,
                Some(property),
                format!("illegal length for {}: {}", sql_type, length_arg),
            ));
        }
        column.length = Some(length_arg.to_string());
    }

    Ok(())
}

/// 整数族的缺省显示宽度
fn default_int_width(sql_type: &str) -> Option<u32> {
    match sql_type {
        "INT" => Some(11),
        "BIGINT" => Some(20),
        "TINYINT" => Some(4),
        "SMALLINT" => Some(6),
        "MEDIUMINT" => Some(9),
        _ => None,
    }
}

fn parse_composite(model: &str, arg: &str, unique: bool) -> SResult<CompositeIndex> {
    let captures = COMPOSITE_RE.captures(arg.trim()).ok_or_else(|| {
        SchemaError::invalid_model(
            model,
            None,
            format!("@composite expects [name] (col, col, …), got: {}", arg),
        )
    })?;

    let name = captures.get(1).map(|m| m.as_str().to_string());
    let columns: Vec<String> = captures[2]
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if columns.len() < 2 {
        return Err(SchemaError::invalid_model(
            model,
            None,
            "composite index needs at least two columns".to_string(),
        ));
    }
    for column in &columns {
        if !is_valid_ident(column) {
            return Err(SchemaError::invalid_model(
                model,
                None,
                format!("illegal column in composite index: {}", column),
            ));
        }
    }

    Ok(CompositeIndex::new(name, columns, unique))
}

fn parse_partition(model: &str, arg: &str) -> SResult<PartitionDef> {
    let captures = PARTITION_RE.captures(arg.trim()).ok_or_else(|| {
        SchemaError::invalid_model(
            model,
            None,
            format!("@partition expects kind(column) [count], got: {}", arg),
        )
    })?;

    // regex 只放行四种 kind
    let kind = PartitionKind::parse(&captures[1]).unwrap();
    let column = captures[2].to_string();
    let count = match captures.get(3) {
        Some(count) => count.as_str().parse::<u32>()?,
        None => {
            if kind.requires_count() {
                return Err(SchemaError::invalid_model(
                    model,
                    None,
                    format!("partition {} requires a partition count", kind.as_sql()),
                ));
            }
            0
        }
    };

    Ok(PartitionDef {
        kind,
        column,
        count,
    })
}

fn split_values(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(|v| strip_quotes(v.trim()))
        .filter(|v| !v.is_empty())
        .collect()
}

fn strip_quotes(value: &str) -> String {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod test {
    use crate::annotation::parser::{lex_annotations, AnnotationParser};
    use crate::ir::column::FkAction;
    use crate::ir::partition::PartitionKind;

    const SAMPLE: &str = r#"
/// @tablecomment "Blog posts"
/// @composite (status, created_at)
/// @compositeUnique unq_slug_lang (slug, lang)
/// @partition hash(author_id) 8
model Posts {
    table = posts;
    timestamps = true;

    /// @autonumber
    id;

    /// @column @varchar 200
    title;

    /// @column @enum draft,published @default draft @index
    status;

    /// @column @varchar 64 @unique
    slug;

    /// @column @varchar 8
    lang;

    /// @column @int @unsigned @index
    /// @foreign users(id) @ondelete CASCADE
    author_id;

    /// @column @datetime @nullable
    created_at;

    /// @column @datetime @nullable
    updated_at;

    /// not a column, plain note
    body_cache;
}
"#;

    #[test]
    fn test_lex() {
        let tokens = lex_annotations("@column @varchar 64 @comment \"a b\" @nullable");
        assert_eq!(
            tokens,
            vec![
                ("column".to_string(), "".to_string()),
                ("varchar".to_string(), "64".to_string()),
                ("comment".to_string(), "\"a b\"".to_string()),
                ("nullable".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_model() {
        let ir = AnnotationParser::parse_text(SAMPLE).unwrap();

        assert_eq!(ir.table_name, "posts");
        assert_eq!(ir.table_comment.as_deref(), Some("Blog posts"));
        assert!(ir.timestamps);

        // body_cache 没有 @column, 不是列
        assert!(ir.column("body_cache").is_none());

        let id = ir.column("id").unwrap();
        assert_eq!(id.sql_type, "INT");
        assert_eq!(id.length.as_deref(), Some("11"));
        assert!(id.primary && id.unsigned && id.auto_increment);

        let status = ir.column("status").unwrap();
        assert_eq!(status.values, vec!["draft", "published"]);
        assert_eq!(status.default.as_deref(), Some("draft"));
        assert!(status.index);

        let author = ir.column("author_id").unwrap();
        let fk = author.foreign.as_ref().unwrap();
        assert_eq!(fk.ref_table, "users");
        assert_eq!(fk.on_delete, FkAction::Cascade);
        assert_eq!(fk.on_update, FkAction::Restrict);

        assert_eq!(ir.composite_indexes[0].name, "idx_status_created_at");
        assert_eq!(ir.composite_unique_indexes[0].name, "unq_slug_lang");

        let partition = ir.partition.as_ref().unwrap();
        assert_eq!(partition.kind, PartitionKind::Hash);
        assert_eq!(partition.count, 8);
    }

    #[test]
    fn test_drop_short_circuits() {
        let ir = AnnotationParser::parse_text(
            "model Items {\n  /// @drop @varchar 10\n  legacy_code;\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();

        let legacy = ir.column("legacy_code").unwrap();
        assert!(legacy.drop);
        assert!(legacy.sql_type.is_empty());
    }

    #[test]
    fn test_rename_keeps_new_name() {
        let ir = AnnotationParser::parse_text(
            "model Posts {\n  /// @rename headline @varchar 200\n  title;\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();

        let title = ir.column("title").unwrap();
        assert_eq!(title.rename.as_deref(), Some("headline"));
        assert_eq!(title.sql_type, "VARCHAR");
        assert_eq!(title.length.as_deref(), Some("200"));
    }

    #[test]
    fn test_column_without_type_fails() {
        let err = AnnotationParser::parse_text(
            "model Users {\n  /// @column @nullable\n  email;\n}",
        )
        .unwrap_err();
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_unknown_token_fails() {
        assert!(AnnotationParser::parse_text(
            "model Users {\n  /// @column @xint 11\n  age;\n}"
        )
        .is_err());
    }

    #[test]
    fn test_boolean_alias() {
        let ir = AnnotationParser::parse_text(
            "model Flags {\n  /// @autonumber\n  id;\n  /// @column @bool\n  active;\n  /// @column @boolean\n  hidden;\n}",
        )
        .unwrap();

        for name in ["active", "hidden"] {
            let column = ir.column(name).unwrap();
            assert_eq!(column.sql_type, "TINYINT");
            assert_eq!(column.length.as_deref(), Some("1"));
            assert_eq!(column.default.as_deref(), Some("0"));
        }
    }

    #[test]
    fn test_decimal_default_length() {
        let ir = AnnotationParser::parse_text(
            "model Orders {\n  /// @autonumber\n  id;\n  /// @column @decimal\n  total;\n}",
        )
        .unwrap();
        assert_eq!(ir.column("total").unwrap().length.as_deref(), Some("10,2"));
    }

    #[test]
    fn test_partition_count_required_for_hash() {
        assert!(AnnotationParser::parse_text(
            "/// @partition hash(tenant_id)\nmodel T {\n  /// @autonumber\n  id;\n}"
        )
        .is_err());

        // range 没有 count 也能解析, 生成阶段才拒绝
        let ir = AnnotationParser::parse_text(
            "/// @partition range(created_at)\nmodel T {\n  /// @autonumber\n  id;\n}",
        )
        .unwrap();
        assert_eq!(ir.partition.unwrap().kind, crate::ir::partition::PartitionKind::Range);
    }
}
