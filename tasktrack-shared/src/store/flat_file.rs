/// Line-oriented flat file store
///
/// A `FlatFile` manages one newline-terminated text file holding one record
/// per line, with no header row. There is no row id: the exact text of a line
/// is its identity for `replace` and `delete_line`, and both act on the
/// *first* exact match only. Callers must therefore ensure that no two live
/// records serialize to the same line.
///
/// Whole-file rewrites go through a temporary file and a rename so a crash
/// mid-write leaves either the old or the new content on disk. Every rewrite
/// uses its own temporary file. Nothing serializes concurrent writers: the
/// last rename wins, and a writer whose expected line was already replaced by
/// someone else gets `LineNotFound`.
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::store::FlatFile;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = FlatFile::new("data/users.csv");
/// file.append("a,b").await?;
/// file.replace("a,b", "a,c").await?;
/// assert_eq!(file.read_all().await?, vec!["a,c".to_string()]);
/// # Ok(())
/// # }
/// ```

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

/// Flat file store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// No line exactly equal to the expected one exists
    #[error("line not found in {}", path.display())]
    LineNotFound {
        /// File that was searched
        path: PathBuf,
    },

    /// Underlying file system error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// One managed record file
#[derive(Debug, Clone)]
pub struct FlatFile {
    path: PathBuf,
}

impl FlatFile {
    /// Creates a handle for `path`; the file is created lazily on first write
    pub fn new(path: impl AsRef<Path>) -> Self {
        FlatFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the managed file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads every non-empty line, without parsing
    ///
    /// A missing file reads as empty.
    pub async fn read_all(&self) -> StoreResult<Vec<String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let lines: Vec<String> = content
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(path = %self.path.display(), lines = lines.len(), "Read flat file");
        Ok(lines)
    }

    /// Appends one line, creating the file if needed
    pub async fn append(&self, line: &str) -> StoreResult<()> {
        Self::check_single_line(line).map_err(|e| self.io_error(e))?;
        self.ensure_parent().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Appended line");
        Ok(())
    }

    /// Replaces the first line exactly equal to `old_line` with `new_line`
    ///
    /// All other lines keep their content and order.
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if no line equals `old_line`
    pub async fn replace(&self, old_line: &str, new_line: &str) -> StoreResult<()> {
        Self::check_single_line(new_line).map_err(|e| self.io_error(e))?;

        let mut lines = self.read_all().await?;
        let idx = self.position(&lines, old_line)?;
        lines[idx] = new_line.to_string();
        self.write_lines(&lines).await?;

        debug!(path = %self.path.display(), line = idx, "Replaced line");
        Ok(())
    }

    /// Removes the first line exactly equal to `line`
    ///
    /// # Errors
    ///
    /// Returns `LineNotFound` if no line equals `line`
    pub async fn delete_line(&self, line: &str) -> StoreResult<()> {
        let mut lines = self.read_all().await?;
        let idx = self.position(&lines, line)?;
        lines.remove(idx);
        self.write_lines(&lines).await?;

        debug!(path = %self.path.display(), line = idx, "Deleted line");
        Ok(())
    }

    /// Truncates the file to empty
    pub async fn clear(&self) -> StoreResult<()> {
        self.ensure_parent().await?;
        fs::write(&self.path, b"")
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Cleared flat file");
        Ok(())
    }

    fn position(&self, lines: &[String], wanted: &str) -> StoreResult<usize> {
        lines
            .iter()
            .position(|line| line == wanted)
            .ok_or_else(|| StoreError::LineNotFound {
                path: self.path.clone(),
            })
    }

    fn check_single_line(line: &str) -> io::Result<()> {
        if line.contains('\n') || line.contains('\r') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "record line must not contain line breaks",
            ));
        }
        Ok(())
    }

    async fn ensure_parent(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }
        Ok(())
    }

    async fn write_lines(&self, lines: &[String]) -> StoreResult<()> {
        self.ensure_parent().await?;

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        // One temp file per rewrite so concurrent rewrites never share it
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(self.io_error(e));
        }
        Ok(())
    }
}
