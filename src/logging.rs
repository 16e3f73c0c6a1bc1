// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Process-wide logging setup.
//!
//! Records go to the console through `env_logger`, which also decides which records pass based
//! on `RUST_LOG`.  Records that pass are additionally appended as JSON lines to `all.log`, and
//! error records to `error.log`, within the configured log directory.

use crate::clocks::{Clock, SystemClock};
use crate::env::get_optional_var;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use time::format_description::well_known::Rfc3339;

/// Default directory where log files are written.
const DEFAULT_LOG_DIR: &str = "logs";

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Options to configure logging.
#[derive(Debug, PartialEq)]
pub struct LogOptions {
    /// Directory where the log files are written.  Created if it does not exist.
    pub dir: PathBuf,
}

impl LogOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_LOG_DIR`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            dir: get_optional_var::<PathBuf>(prefix, "LOG_DIR")?
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        })
    }
}

/// Destination for log records formatted as one JSON object per line.
struct JsonSink {
    /// Most verbose level accepted by this sink.
    level: LevelFilter,

    /// Where the formatted records go.
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonSink {
    /// Creates a sink that writes records at `level` or more severe to `writer`.
    fn new(level: LevelFilter, writer: Box<dyn Write + Send>) -> Self {
        Self { level, writer: Mutex::new(writer) }
    }

    /// Appends `record` to the sink if its level is accepted, stamping it with `now`.
    fn write(&self, record: &Record, now: &str) {
        if record.level() > self.level {
            return;
        }

        let line = serde_json::json!({
            "timestamp": now,
            "level": record.level().to_string(),
            "target": record.target(),
            "message": record.args().to_string(),
        });
        if let Err(e) = writeln!(self.lock(), "{}", line) {
            eprintln!("Failed to write log record: {}", e);
        }
    }

    /// Flushes any buffered records.
    fn flush(&self) {
        if let Err(e) = self.lock().flush() {
            eprintln!("Failed to flush log records: {}", e);
        }
    }

    /// Grabs the writer, recovering it if a previous holder panicked.
    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Logger that fans records out to the console and to a collection of JSON sinks.
struct Logger {
    /// Console logger, which also holds the filter configured by the user.
    console: env_logger::Logger,

    /// Additional destinations for records that pass the console filter.
    sinks: Vec<JsonSink>,

    /// Source of the timestamps attached to JSON records.
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);

        let now = self.clock.now_utc();
        let now = now.format(&Rfc3339).unwrap_or_else(|_| now.unix_timestamp().to_string());
        for sink in &self.sinks {
            sink.write(record, &now);
        }
    }

    fn flush(&self) {
        self.console.flush();
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

/// Opens `path` for appending, creating it if necessary.
fn open_log(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Cannot open log file {}: {}", path.display(), e))
}

/// Installs the process-wide logger configured by `opts`.  Can only be called once.
pub fn init(opts: LogOptions) -> Result<(), String> {
    fs::create_dir_all(&opts.dir)
        .map_err(|e| format!("Cannot create log directory {}: {}", opts.dir.display(), e))?;
    let all = open_log(&opts.dir.join("all.log"))?;
    let errors = open_log(&opts.dir.join("error.log"))?;

    let console =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
            .build();
    let max_level = console.filter();
    let logger = Logger {
        console,
        sinks: vec![
            JsonSink::new(LevelFilter::Trace, Box::new(all)),
            JsonSink::new(LevelFilter::Error, Box::new(errors)),
        ],
        clock: Arc::new(SystemClock::default()),
    };

    log::set_boxed_logger(Box::new(logger)).map_err(|e| e.to_string())?;
    log::set_max_level(max_level);
    Ok(())
}
