use std::{ffi::OsStr, path::Path};

use tracing::info;

use crate::{
    event::EventGroup,
    parse::{load_trace, TraceError},
};

/// Trace files in `dir` with the given extension, sorted by path.
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<String>, TraceError> {
    let io_error = |source| TraceError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut result = vec![];
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && path.extension() == Some(OsStr::new(extension)) {
            info!(?path, "Found trace");
            result.push(path.to_string_lossy().into_owned());
        }
    }
    result.sort();

    Ok(result)
}

/// Parses every trace file in `dir`. The first parse error aborts the whole batch.
#[tracing::instrument(level = "error", skip(dir), fields(dir = %dir.display()))]
pub fn load_batch(dir: &Path, extension: &str) -> Result<Vec<EventGroup>, TraceError> {
    let paths = discover(dir, extension)?;
    if paths.is_empty() {
        return Err(TraceError::EmptyInput {
            dir: dir.display().to_string(),
        });
    }

    paths.iter().map(|path| load_trace(path)).collect()
}

#[test]
fn test_load_batch() -> jane_eyre::eyre::Result<()> {
    let dir = std::env::temp_dir().join(format!("surflog-batch-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("b.surflog"), "Info;\tsecond\nKernel;\tA;\t2.0\n")?;
    std::fs::write(dir.join("a.surflog"), "Info;\tfirst\nKernel;\tA;\t1.0\n")?;
    std::fs::write(dir.join("notes.txt"), "Bogus\n")?;

    let groups = load_batch(&dir, "surflog")?;
    let descriptions = groups.iter().map(|g| g.description()).collect::<Vec<_>>();
    assert_eq!(descriptions, ["first", "second"]);

    std::fs::write(dir.join("c.surflog"), "Kernel;\tA\n")?;
    assert!(matches!(
        load_batch(&dir, "surflog"),
        Err(TraceError::MalformedRecord { line: 1, .. })
    ));

    let empty = dir.join("empty");
    std::fs::create_dir_all(&empty)?;
    assert!(matches!(
        load_batch(&empty, "surflog"),
        Err(TraceError::EmptyInput { .. })
    ));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
