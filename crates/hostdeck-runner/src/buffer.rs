//! Append-only output buffer with a write notification hook.

use std::fmt;
use std::io::{self, Write};

use parking_lot::RwLock;

/// Hook invoked after every non-empty write.
pub type NotifyFn = Box<dyn Fn() + Send + Sync>;

/// Thread-safe, append-only byte accumulator.
///
/// One writer (the execution task) appends while any number of readers take
/// snapshots. A snapshot always observes a complete prefix of the data.
pub struct OutputBuffer {
    data: RwLock<Vec<u8>>,
    notify: NotifyFn,
}

impl OutputBuffer {
    /// Create an empty buffer that calls `notify` after each non-empty write.
    ///
    /// The hook runs while the write lock is held, so it must not block or
    /// read from this buffer.
    pub fn new(notify: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            data: RwLock::new(Vec::new()),
            notify: Box::new(notify),
        }
    }

    /// Append `bytes`, returning the number of bytes written.
    pub fn write(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let mut data = self.data.write();
        data.extend_from_slice(bytes);
        (self.notify)();

        bytes.len()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of the raw bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Contents as text, replacing invalid UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.read()).into_owned()
    }

    /// Copy the current contents to `sink` under the read lock.
    pub fn copy_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<u64> {
        let data = self.data.read();
        sink.write_all(&data)?;
        Ok(data.len() as u64)
    }
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("len", &self.len())
            .finish()
    }
}
