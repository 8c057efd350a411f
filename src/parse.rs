use std::{fs::File, io::Read, num::ParseFloatError};

use thiserror::Error;
use tracing::{debug, info};

use crate::event::{Category, Event, EventGroup};

/// Errors from reading and parsing trace files. Every parse error names exactly one file and line.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("{path}:{line}: unrecognized record kind {tag:?}")]
    UnrecognizedRecordKind {
        path: String,
        line: usize,
        tag: String,
    },

    #[error("{path}:{line}: malformed {tag} record: expected {expected} fields, found {found}")]
    MalformedRecord {
        path: String,
        line: usize,
        tag: String,
        expected: usize,
        found: usize,
    },

    #[error("{path}:{line}: invalid duration {field:?}: {source}")]
    InvalidDuration {
        path: String,
        line: usize,
        field: String,
        source: DurationError,
    },

    #[error("no trace files found in {dir}")]
    EmptyInput { dir: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DurationError {
    #[error(transparent)]
    Parse(#[from] ParseFloatError),

    #[error("durations must be finite and non-negative")]
    OutOfRange,
}

#[tracing::instrument(level = "error")]
pub fn load_trace(path: &str) -> Result<EventGroup, TraceError> {
    info!("Parsing trace");

    let mut text = String::default();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut text))
        .map_err(|source| TraceError::Io {
            path: path.to_owned(),
            source,
        })?;

    parse_trace(path, &text)
}

pub fn parse_trace(path: &str, text: &str) -> Result<EventGroup, TraceError> {
    let mut group = EventGroup::new(path);
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for (i, line) in text.lines().enumerate() {
        let line_number = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let tokens = line.split(';').map(str::trim).collect::<Vec<_>>();
        let tag = tokens[0];
        let malformed = |expected| TraceError::MalformedRecord {
            path: path.to_owned(),
            line: line_number,
            tag: tag.to_owned(),
            expected,
            found: tokens.len(),
        };

        if tag == "Info" {
            let [_, description, ..] = tokens[..] else {
                return Err(malformed(2));
            };
            group.push_info(description);
            continue;
        }

        let Ok(category) = tag.parse::<Category>() else {
            return Err(TraceError::UnrecognizedRecordKind {
                path: path.to_owned(),
                line: line_number,
                tag: tag.to_owned(),
            });
        };
        let [_, name, duration, ..] = tokens[..] else {
            return Err(malformed(3));
        };
        let duration = parse_duration(duration).map_err(|source| TraceError::InvalidDuration {
            path: path.to_owned(),
            line: line_number,
            field: duration.to_owned(),
            source,
        })?;
        debug!(%category, name, duration, "Event");
        group.push(Event::new(category, name, duration));
    }

    Ok(group)
}

fn parse_duration(field: &str) -> Result<f64, DurationError> {
    let result = field.parse::<f64>()?;
    if !result.is_finite() || result < 0.0 {
        return Err(DurationError::OutOfRange);
    }

    Ok(result)
}

#[test]
fn test_parse_trace() -> Result<(), TraceError> {
    let group = parse_trace(
        "run1.surflog",
        "Info;\tTesla C2050\nInfo;\tHost gpu01\n\nKernel;\tA;\t10\nKernel;\tB;\t5\nIO;\tcopyImageToDevice;\t0.250\n",
    )?;
    assert_eq!(group.description(), "Tesla C2050");
    assert_eq!(
        group.events(Category::Kernel),
        [
            Event::new(Category::Kernel, "A", 10.0),
            Event::new(Category::Kernel, "B", 5.0),
        ]
    );
    assert_eq!(
        group.events(Category::Io),
        [Event::new(Category::Io, "copyImageToDevice", 0.25)]
    );
    assert!(group.events(Category::User).is_empty());
    Ok(())
}

#[test]
fn test_parse_trace_errors() {
    let result = parse_trace("x.surflog", "Kernel;A;1\nBogus;A;1\n");
    assert!(matches!(
        result,
        Err(TraceError::UnrecognizedRecordKind { line: 2, ref tag, .. }) if tag == "Bogus"
    ));

    let result = parse_trace("x.surflog", "Compile;onlyname\n");
    assert!(matches!(
        result,
        Err(TraceError::MalformedRecord {
            line: 1,
            expected: 3,
            found: 2,
            ..
        })
    ));

    let result = parse_trace("x.surflog", "Info\n");
    assert!(matches!(
        result,
        Err(TraceError::MalformedRecord { expected: 2, .. })
    ));

    let result = parse_trace("x.surflog", "User;marker;fast\n");
    assert!(matches!(
        result,
        Err(TraceError::InvalidDuration { line: 1, ref field, .. }) if field == "fast"
    ));
}

#[test]
fn test_parse_trace_rejects_out_of_range_durations() {
    for field in ["-1", "-0.5", "NaN", "inf", "-inf", "1e400"] {
        let result = parse_trace("x.surflog", &format!("Kernel;\tA;\t1\nKernel;\tB;\t{field}\n"));
        assert!(
            matches!(
                result,
                Err(TraceError::InvalidDuration {
                    line: 2,
                    source: DurationError::OutOfRange,
                    ..
                })
            ),
            "{field}: {result:?}"
        );
    }
    assert!(parse_trace("x.surflog", "Kernel;A;0\nKernel;B;-0\n").is_ok());
}

#[test]
fn test_parse_trace_skips_byte_order_mark() -> Result<(), TraceError> {
    let group = parse_trace("bom.surflog", "\u{feff}Info;\tTesla C2050\nKernel;\tA;\t1.5\n")?;
    assert_eq!(group.description(), "Tesla C2050");
    assert_eq!(
        group.events(Category::Kernel),
        [Event::new(Category::Kernel, "A", 1.5)]
    );
    Ok(())
}
