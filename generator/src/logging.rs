use chrono::{Datelike, Local, Timelike};
use log::{LevelFilter, Record};
use std::fmt::Arguments;
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "[$Y-$m-$D $H:$M $LEVEL] $MESSAGE";

pub fn setup(log_level: &LevelFilter, format: String) -> Result<(), LogError> {
    if log_level.eq(&LevelFilter::Off) {
        return Ok(());
    }

    // Stdout is reserved for the summaries
    fern::Dispatch::new()
        .level(*log_level)
        .format(move |out, message, record| {
            let formatted = parse_format(format.clone(), message, record);

            out.finish(format_args!("{}", formatted))
        })
        .chain(std::io::stderr())
        .apply()
        .map_err(LogError::SetLoggerError)
}

pub fn parse_format(format: String, message: &Arguments, record: &Record) -> String {
    let mut log = format.trim().to_string();

    // Time
    let time = Local::now();
    log = log.replacen("$Y", &format!("{:0>2}", time.year()), 1);
    log = log.replacen("$m", &format!("{:0>2}", time.month()), 1);
    log = log.replacen("$D", &format!("{:0>2}", time.day()), 1);
    log = log.replacen("$H", &format!("{:0>2}", time.hour()), 1);
    log = log.replacen("$M", &format!("{:0>2}", time.minute()), 1);
    log = log.replacen("$S", &format!("{:0>2}", time.second()), 1);

    // Level
    log = log.replacen("$LEVEL", record.level().as_str(), 1);

    // Target
    log = log.replacen("$TARGET", record.target(), 1);

    // Message
    log = log.replacen("$MESSAGE", &message.to_string(), 1);

    log
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Logger initialization error.")]
    SetLoggerError(log::SetLoggerError),
}

impl LogError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            LogError::SetLoggerError(err) => Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_target_and_message() {
        let record = Record::builder()
            .level(log::Level::Warn)
            .target("capture::file")
            .build();

        let formatted = parse_format(
            "  $LEVEL $TARGET: $MESSAGE ".to_string(),
            &format_args!("Wrote {} records", 2),
            &record,
        );
        assert_eq!(formatted, "WARN capture::file: Wrote 2 records");
    }

    #[test]
    fn test_default_format_has_no_placeholders_left() {
        let record = Record::builder().level(log::Level::Info).build();
        let formatted =
            parse_format(DEFAULT_FORMAT.to_string(), &format_args!("done"), &record);

        assert!(formatted.starts_with('['));
        assert!(formatted.ends_with("INFO] done"));
        assert!(!formatted.contains('$'));
    }
}
