use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Level;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// TracingFactory 是否全局初始化完成
static IS_INIT: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Default)]
pub struct TracingFactory {
    options: TracingFactoryOptions,
}

#[derive(Debug, Clone)]
pub struct TracingFactoryOptions {
    debug: bool,

    output_type: OutputType,

    level: Option<Level>,

    log_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OutputType {
    STDOUT,

    LOG,
}

impl Default for TracingFactoryOptions {
    fn default() -> Self {
        TracingFactoryOptions {
            debug: false,
            output_type: OutputType::STDOUT,
            level: None,
            log_dir: None,
        }
    }
}

impl TracingFactoryOptions {
    pub fn new(debug: bool, output_type: OutputType, log_dir: Option<String>) -> Self {
        TracingFactoryOptions {
            debug,
            output_type,
            level: match debug {
                true => Some(Level::DEBUG),
                false => None,
            },
            log_dir,
        }
    }

    pub fn new_with_debug(debug: bool) -> Self {
        TracingFactoryOptions::new(debug, OutputType::STDOUT, None)
    }
}

impl TracingFactory {
    pub fn init_log(debug: bool) -> Self {
        TracingFactory::init_log_with_options(TracingFactoryOptions::new_with_debug(debug))
    }

    pub fn init_log_with_options(opt: TracingFactoryOptions) -> Self {
        let mut opts = opt.clone();

        let dir = match opt.log_dir {
            None => {
                let path = String::from("/tmp/schema_cli/logs");
                opts.log_dir = Some(path.clone());

                path
            }
            Some(dir) => dir.clone(),
        };

        let level = match opts.level {
            None => Level::INFO,
            Some(l) => l,
        };

        if !IS_INIT.swap(true, Ordering::SeqCst) {
            // Configure a custom event formatter
            let format = fmt::format()
                .pretty()
                // display source code file paths
                .with_file(true)
                // display source code line numbers
                .with_line_number(false)
                .with_target(false) // don't include targets, disable targets
                // enable thread id to be emitted
                .with_thread_ids(true)
                // enabled thread name to be emitted
                .with_thread_names(true)
                .compact(); // use the `Compact` formatting style.

            match opts.output_type {
                OutputType::STDOUT => {
                    let _ = tracing_subscriber::fmt()
                        .with_max_level(level)
                        .event_format(format)
                        .pretty()
                        // sets this to be the default, global collector for this application.
                        .try_init();
                }
                OutputType::LOG => {
                    // debug 模式下，std 与 log 同时输出。 否则只输出 file
                    let file_appender =
                        rolling::daily(format!("{}/schema", dir.as_str()), "file.log");

                    let merge = file_appender.and(io::stdout);

                    let _ = tracing_subscriber::fmt()
                        .with_max_level(level)
                        .event_format(format)
                        .pretty()
                        .with_writer(merge)
                        // sets this to be the default, global collector for this application.
                        .try_init();
                }
            };
        }

        TracingFactory {
            options: opts.clone(),
        }
    }

    pub fn get_log_dir(&self) -> &str {
        self.options.get_log_dir()
    }

    pub fn is_debug(&self) -> bool {
        self.options.debug
    }
}

impl TracingFactoryOptions {
    pub fn get_log_dir(&self) -> &str {
        match &self.log_dir {
            None => "",
            Some(dir) => dir.as_str(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::log::tracing_factory::TracingFactory;

    #[test]
    fn test_init_twice() {
        let f = TracingFactory::init_log(true);
        assert!(f.is_debug());

        // 重复初始化不报错
        let f = TracingFactory::init_log(false);
        assert!(!f.is_debug());
    }
}
