use std::path::Path;

/// Where a finished score is written.
pub trait OutputSink: Send + Sync {
    fn write(&self, path: &Path, content: &str) -> std::io::Result<()>;
}

/// Writes to the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        std::fs::write(path, content)
    }
}
