use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use common::err::schema_error::SchemaError;
use common::err::SResult;
use common::file_util::{create_file, ensure_dir, open_file};
use common::pretty_util::to_string_pretty;
use common::server::Server;

use connection::conn::connection::{Connection, IConnection};
use connection::conn::connection_options::ConnectionOptions;

use dump::reader::RestoreReader;
use dump::writer::{dump_table_csv, DumpWriter};

use schema::annotation::model::ModelSource;
use schema::annotation::parser::AnnotationParser;
use schema::ir::table::TableIr;
use schema::migrate::diff;
use schema::migrate::snapshot::observed_to_ir;
use schema::observed::table_reader::TableReader;
use schema::reconcile::plan::Plan;
use schema::reconcile::reconciler::Reconciler;
use schema::validate::fix::apply_auto_fixes;
use schema::validate::validate;
use schema::{is_valid_ident, quote_ident};

use common::config::ToolConfig;

use crate::cli_options::CliOptions;
use crate::executor::PlanExecutor;
use crate::prompt;
use crate::{Commands, DbCommands, ModelCommands};

/// 命令分发器。 持有唯一的数据库连接, 一次进程处理一条命令
pub(crate) struct CliClient {
    options: CliOptions,

    config: ToolConfig,

    command: Commands,

    connection: Connection,
}

impl CliClient {
    pub(crate) fn new(options: CliOptions, config: ToolConfig, command: Commands) -> Self {
        let connection_options = ConnectionOptions::from_config(&config.mysql);

        CliClient {
            options,
            config,
            command,
            connection: Connection::new(connection_options),
        }
    }
}

#[async_trait::async_trait]
impl Server for CliClient {
    async fn start(&mut self) -> Result<(), SchemaError> {
        // 库级命令操作的可能就是配置里的库, 连接时不选库
        if self.connects_without_database() {
            self.connection.options.database = None;
        }

        self.connection.try_connect()?;
        debug!("connected to {}", self.connection.options.hostname);

        let command = self.command.clone();
        match command {
            Commands::Model { command } => match command {
                ModelCommands::CreateTable { model } => self.create_table(&model),
                ModelCommands::UpdateTable { model } => self.update_table(&model),
                ModelCommands::DropTable { model } => self.drop_table(&model),
                ModelCommands::EmptyTable { model } => self.empty_table(&model),
                ModelCommands::RenameTable { model, new_name } => {
                    self.rename_table(&model, &new_name)
                }
                ModelCommands::TableSchema { model } => self.table_schema(&model),
                ModelCommands::ExportTable { model, file } => self.export_table(&model, file),
            },
            Commands::Db { command } => match command {
                DbCommands::Schema => self.db_schema(),
                DbCommands::Export { file } => self.db_export(file),
                DbCommands::Import { file } => self.db_import(file),
                DbCommands::List => self.db_list(),
                DbCommands::Tables { database } => self.db_tables(database),
                DbCommands::Create { database } => self.db_create(database),
                DbCommands::Drop { database } => self.db_drop(database),
                DbCommands::Empty => self.db_empty(),
                DbCommands::Seed { name } => self.db_seed(name),
                DbCommands::Diff { out } => self.db_diff(out),
            },
        }
    }

    async fn shutdown(&mut self, _graceful: bool) -> Result<(), SchemaError> {
        self.connection.close();
        Ok(())
    }
}

impl CliClient {
    fn connects_without_database(&self) -> bool {
        matches!(
            &self.command,
            Commands::Db {
                command: DbCommands::List | DbCommands::Create { .. } | DbCommands::Drop { .. }
            }
        )
    }

    fn model_path(&self, model: &str) -> PathBuf {
        PathBuf::from(self.config.base.models_dir()).join(format!("{}.model", model))
    }

    fn load_model(&self, model: &str) -> SResult<TableIr> {
        let path = self.model_path(model);
        debug!("loading model from {:?}", path);

        let source = ModelSource::from_file(&path)?;
        AnnotationParser::parse(&source)
    }

    /// 加载模型并对可自动修复的违反项交互式补全。
    /// 剩下的违反项留给 plan 阶段报 InvalidModel
    fn load_model_checked(&mut self, model: &str) -> SResult<TableIr> {
        let mut ir = self.load_model(model)?;

        let checks = validate(&ir);
        if checks.is_empty() {
            return Ok(ir);
        }

        if checks.iter().any(|c| c.auto_fixable) {
            for check in checks.iter().filter(|c| c.auto_fixable) {
                prompt::warn(&check.suggestion);
            }

            let mut confirm = self.confirm_fn();
            let accepted = confirm("apply automatic fixes to the model?");
            drop(confirm);

            if accepted {
                for line in apply_auto_fixes(&mut ir, &checks) {
                    prompt::success(&line);
                }
            }
        }

        Ok(ir)
    }

    /// 需要确认时问用户, --yes 时静默通过
    fn confirm_fn(&self) -> impl FnMut(&str) -> bool {
        let assume_yes = self.options.is_assume_yes();
        move |message: &str| assume_yes || prompt::confirm(message)
    }

    fn database_label(&self) -> String {
        self.config
            .mysql
            .database
            .clone()
            .unwrap_or_else(|| "database".to_string())
    }

    fn exports_dir(&self) -> SResult<PathBuf> {
        ensure_dir(self.config.base.exports_dir())
    }

    fn execute_plan(&mut self, plan: &Plan, row_estimate: u64, byte_size: u64) -> SResult<()> {
        let mut confirm = self.confirm_fn();
        let mut executor = PlanExecutor::new(&mut self.connection);
        executor.execute(plan, row_estimate, byte_size, &mut confirm)
    }

    ///////////////////////////////////////////////////
    // model 级命令 //
    ///////////////////////////////////////////////////

    fn create_table(&mut self, model: &str) -> SResult<()> {
        let ir = self.load_model_checked(model)?;

        let exists = {
            let mut reader = TableReader::new(&mut self.connection);
            reader.table_exists(&ir.table_name)?
        };

        if exists {
            let mut confirm = self.confirm_fn();
            if !confirm(&format!(
                "table `{}` already exists and will be dropped, continue?",
                ir.table_name
            )) {
                return Err(SchemaError::UserAborted);
            }
        }

        let plan = {
            let mut reader = TableReader::new(&mut self.connection);
            Reconciler::plan_create(&ir, &mut reader, exists)?
        };

        self.execute_plan(&plan, 0, 0)
    }

    fn update_table(&mut self, model: &str) -> SResult<()> {
        let ir = self.load_model_checked(model)?;

        let exists = {
            let mut reader = TableReader::new(&mut self.connection);
            reader.table_exists(&ir.table_name)?
        };

        if !exists {
            let plan = {
                let mut reader = TableReader::new(&mut self.connection);
                Reconciler::plan_create(&ir, &mut reader, false)?
            };
            return self.execute_plan(&plan, 0, 0);
        }

        let (observed, row_estimate, byte_size) = {
            let mut reader = TableReader::new(&mut self.connection);
            let observed = reader.observe(&ir.table_name)?;
            let row_estimate = reader.row_count_estimate(&ir.table_name)?;
            let byte_size = reader.byte_size(&ir.table_name)?;
            (observed, row_estimate, byte_size)
        };

        let plan = Reconciler::plan_update(&ir, &observed)?;
        self.execute_plan(&plan, row_estimate, byte_size)
    }

    fn drop_table(&mut self, model: &str) -> SResult<()> {
        let ir = self.load_model(model)?;
        let table = ir.table_name;

        let mut confirm = self.confirm_fn();
        if !confirm(&format!("drop table `{}`?", table)) {
            return Err(SchemaError::UserAborted);
        }
        if !confirm(&format!(
            "really drop `{}`? all data will be lost",
            table
        )) {
            return Err(SchemaError::UserAborted);
        }
        drop(confirm);

        self.connection
            .exec(format!("DROP TABLE IF EXISTS {};", quote_ident(&table)))?;
        prompt::success(&format!("table `{}` dropped", table));
        Ok(())
    }

    fn empty_table(&mut self, model: &str) -> SResult<()> {
        let ir = self.load_model(model)?;
        let table = ir.table_name;

        let mut confirm = self.confirm_fn();
        if !confirm(&format!("delete all rows from `{}`?", table)) {
            return Err(SchemaError::UserAborted);
        }
        drop(confirm);

        let affected = self
            .connection
            .exec(format!("DELETE FROM {};", quote_ident(&table)))?;
        prompt::success(&format!("table `{}` emptied ({} rows)", table, affected));
        Ok(())
    }

    fn rename_table(&mut self, model: &str, new_name: &str) -> SResult<()> {
        if !is_valid_ident(new_name) {
            return Err(SchemaError::String(format!(
                "illegal table name: {}",
                new_name
            )));
        }

        let ir = self.load_model(model)?;
        self.connection.exec(format!(
            "RENAME TABLE {} TO {};",
            quote_ident(&ir.table_name),
            quote_ident(new_name)
        ))?;
        prompt::success(&format!("table `{}` renamed to `{}`", ir.table_name, new_name));
        Ok(())
    }

    fn table_schema(&mut self, model: &str) -> SResult<()> {
        let ir = self.load_model(model)?;

        let observed = {
            let mut reader = TableReader::new(&mut self.connection);
            reader.observe(&ir.table_name)?
        };

        prompt::line(&to_string_pretty(&self.options.get_format(), &observed));
        Ok(())
    }

    fn export_table(&mut self, model: &str, file: Option<PathBuf>) -> SResult<()> {
        let ir = self.load_model(model)?;
        let table = ir.table_name;

        let path = match file {
            Some(path) => path,
            None => DumpWriter::default_export_path(&self.exports_dir()?, &table),
        };

        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        let mut sink = create_file(&path)?;
        if is_csv {
            let rows = dump_table_csv(&mut self.connection, &table, &mut sink)?;
            prompt::success(&format!("wrote {} rows to {:?}", rows, path));
        } else {
            let label = self.database_label();
            let stats =
                DumpWriter::dump(&mut self.connection, &label, &[table], &mut sink)?;
            prompt::success(&format!("wrote {} rows to {:?}", stats.rows, path));
        }
        Ok(())
    }

    ///////////////////////////////////////////////////
    // db 级命令 //
    ///////////////////////////////////////////////////

    fn db_schema(&mut self) -> SResult<()> {
        let format = self.options.get_format();
        let mut reader = TableReader::new(&mut self.connection);

        for table in reader.table_names()? {
            let observed = reader.observe(&table)?;
            prompt::line(&to_string_pretty(&format, &observed));
        }
        Ok(())
    }

    fn db_export(&mut self, file: Option<PathBuf>) -> SResult<()> {
        let label = self.database_label();
        let path = match file {
            Some(path) => path,
            None => DumpWriter::default_export_path(&self.exports_dir()?, &label),
        };

        let tables = {
            let mut reader = TableReader::new(&mut self.connection);
            reader.table_names()?
        };

        let mut sink = create_file(&path)?;
        let stats = DumpWriter::dump(&mut self.connection, &label, &tables, &mut sink)?;
        prompt::success(&format!(
            "wrote {} tables, {} rows to {:?}",
            stats.tables, stats.rows, path
        ));
        Ok(())
    }

    fn db_import(&mut self, file: PathBuf) -> SResult<()> {
        let mut confirm = self.confirm_fn();
        if !confirm(&format!(
            "import {:?} into `{}`? existing tables may be dropped",
            file,
            self.database_label()
        )) {
            return Err(SchemaError::UserAborted);
        }
        drop(confirm);

        let source = open_file(&file)?;
        let stats = RestoreReader::restore(&mut self.connection, source)?;
        prompt::success(&format!("imported {} statements", stats.statements));
        Ok(())
    }

    fn db_list(&mut self) -> SResult<()> {
        let mut reader = TableReader::new(&mut self.connection);
        for database in reader.database_names()? {
            prompt::line(&database);
        }
        Ok(())
    }

    fn db_tables(&mut self, database: Option<String>) -> SResult<()> {
        let mut reader = TableReader::new(&mut self.connection);
        let tables = match database {
            Some(database) => reader.tables_in(&database)?,
            None => reader.table_names()?,
        };
        for table in tables {
            prompt::line(&table);
        }
        Ok(())
    }

    fn named_database(&self, database: Option<String>) -> SResult<String> {
        let name = database.or_else(|| self.config.mysql.database.clone());
        let name = name.ok_or_else(|| {
            SchemaError::String("no database name given and none configured".to_string())
        })?;
        if !is_valid_ident(&name) {
            return Err(SchemaError::String(format!(
                "illegal database name: {}",
                name
            )));
        }
        Ok(name)
    }

    fn db_create(&mut self, database: Option<String>) -> SResult<()> {
        let name = self.named_database(database)?;
        self.connection.exec(format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;",
            quote_ident(&name)
        ))?;
        prompt::success(&format!("database `{}` created", name));
        Ok(())
    }

    fn db_drop(&mut self, database: Option<String>) -> SResult<()> {
        let name = self.named_database(database)?;

        let mut confirm = self.confirm_fn();
        if !confirm(&format!("drop database `{}`?", name)) {
            return Err(SchemaError::UserAborted);
        }
        if !confirm(&format!(
            "really drop `{}`? every table in it will be lost",
            name
        )) {
            return Err(SchemaError::UserAborted);
        }
        drop(confirm);

        self.connection
            .exec(format!("DROP DATABASE IF EXISTS {};", quote_ident(&name)))?;
        prompt::success(&format!("database `{}` dropped", name));
        Ok(())
    }

    /// 清空所有表。 单表失败继续, 与其余命令的即停策略不同
    fn db_empty(&mut self) -> SResult<()> {
        let mut confirm = self.confirm_fn();
        if !confirm(&format!(
            "delete all rows from every table in `{}`?",
            self.database_label()
        )) {
            return Err(SchemaError::UserAborted);
        }
        drop(confirm);

        let tables = {
            let mut reader = TableReader::new(&mut self.connection);
            reader.table_names()?
        };

        self.connection
            .exec("SET FOREIGN_KEY_CHECKS=0;".to_string())?;
        for table in &tables {
            match self
                .connection
                .exec(format!("DELETE FROM {};", quote_ident(table)))
            {
                Ok(affected) => {
                    prompt::success(&format!("emptied `{}` ({} rows)", table, affected))
                }
                Err(err) => prompt::warn(&format!("skipping `{}`: {}", table, err)),
            }
        }
        self.connection
            .exec("SET FOREIGN_KEY_CHECKS=1;".to_string())?;
        Ok(())
    }

    /// 现在的库 → 模型目录 的双向脚本。 up 把库改成模型的样子
    fn db_diff(&mut self, out: Option<PathBuf>) -> SResult<()> {
        let mut desired = BTreeMap::new();
        let models_dir = PathBuf::from(self.config.base.models_dir());
        for entry in std::fs::read_dir(&models_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "model").unwrap_or(false) {
                let source = ModelSource::from_file(&path)?;
                let ir = AnnotationParser::parse(&source)?;
                desired.insert(ir.table_name.clone(), ir);
            }
        }

        let mut live = BTreeMap::new();
        {
            let mut reader = TableReader::new(&mut self.connection);
            for table in reader.table_names()? {
                let observed = reader.observe(&table)?;
                live.insert(table, observed_to_ir(&observed));
            }
        }

        let script = diff(&live, &desired)?;
        if script.is_empty() {
            prompt::info("no differences");
            return Ok(());
        }

        match out {
            Some(base) => {
                let up_path = base.with_extension("up.sql");
                let mut up = create_file(&up_path)?;
                for statement in &script.up {
                    writeln!(up, "{}", statement)?;
                }

                let down_path = base.with_extension("down.sql");
                let mut down = create_file(&down_path)?;
                for statement in &script.down {
                    writeln!(down, "{}", statement)?;
                }

                prompt::success(&format!(
                    "wrote {} up / {} down statements to {:?} and {:?}",
                    script.up.len(),
                    script.down.len(),
                    up_path,
                    down_path
                ));
            }
            None => {
                prompt::line("-- up");
                for statement in &script.up {
                    prompt::line(statement);
                }
                prompt::line("");
                prompt::line("-- down");
                for statement in &script.down {
                    prompt::line(statement);
                }
            }
        }

        Ok(())
    }

    fn db_seed(&mut self, name: Option<String>) -> SResult<()> {
        let name = name.unwrap_or_else(|| "seed".to_string());
        let path = PathBuf::from(self.config.base.seeds_dir()).join(format!("{}.sql", name));

        let source = open_file(&path)?;
        let stats = RestoreReader::restore(&mut self.connection, source)?;
        prompt::success(&format!(
            "seeded {} statements from {:?}",
            stats.statements, path
        ));
        Ok(())
    }
}
