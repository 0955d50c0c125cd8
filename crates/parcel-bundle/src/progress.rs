//! Progress reporting and cancellation for long-running bundle operations.
//!
//! Packing and extraction report one unit per archive entry; copies and
//! downloads report bytes. Every entry boundary and every data chunk is a
//! cancellation checkpoint.

use parcel_core::error::ParcelError;
use parcel_core::utils::HASH_CHUNK_SIZE;
use std::fmt;
use std::io::{self, Read, Write};

use crate::BundleResult;

/// The kind of work being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Compress,
    Extract,
    Download,
    Upload,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Compress => "compress",
            Action::Extract => "extract",
            Action::Download => "download",
            Action::Upload => "upload",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Receives progress updates from pack, extract and transfer operations.
///
/// All methods have no-op defaults. A `total` of zero means the amount of
/// work is not known up front.
pub trait ProgressObserver: Send + Sync {
    fn start(&self, _label: &str, _action: Action, _total: u64) {}

    fn advance(&self, _amount: u64) {}

    fn finish(&self) {}

    /// Polled at every checkpoint; returning `true` aborts the operation
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Fail with `Cancelled` if the observer asked to stop
pub fn checkpoint(observer: &dyn ProgressObserver, action: Action) -> BundleResult<()> {
    if observer.is_cancelled() {
        return Err(ParcelError::Cancelled {
            operation: action.verb().to_string(),
        });
    }
    Ok(())
}

/// Copy `reader` into `writer` in fixed-size chunks.
///
/// When `report_bytes` is set each chunk is reported through `advance`.
pub fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    observer: &dyn ProgressObserver,
    action: Action,
    report_bytes: bool,
) -> BundleResult<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut copied = 0u64;

    loop {
        checkpoint(observer, action)?;

        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ParcelError::io(format!("Failed to read data to {}", action), e)),
        };

        writer
            .write_all(&buffer[..read])
            .map_err(|e| ParcelError::io(format!("Failed to write data to {}", action), e))?;

        copied += read as u64;
        if report_bytes {
            observer.advance(read as u64);
        }
    }

    Ok(copied)
}

/// Reader adapter that fails once the observer is cancelled.
///
/// Used where a library drives the copy loop itself. The caller turns the
/// resulting IO error back into `Cancelled` with [`cancelled_or`].
pub struct CheckedReader<'a, R> {
    inner: R,
    observer: &'a dyn ProgressObserver,
}

impl<'a, R> CheckedReader<'a, R> {
    pub fn new(inner: R, observer: &'a dyn ProgressObserver) -> Self {
        Self { inner, observer }
    }
}

impl<R: Read> Read for CheckedReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.observer.is_cancelled() {
            return Err(io::Error::other("operation cancelled"));
        }
        self.inner.read(buf)
    }
}

/// Map an error raised during a copy to `Cancelled` if the observer stopped it
pub fn cancelled_or(
    observer: &dyn ProgressObserver,
    action: Action,
    err: ParcelError,
) -> ParcelError {
    if observer.is_cancelled() {
        ParcelError::Cancelled {
            operation: action.verb().to_string(),
        }
    } else {
        err
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_copy_reports_bytes() {
        let data = vec![1u8; HASH_CHUNK_SIZE * 2 + 5];
        let mut out = Vec::new();
        let recorder = Recorder::default();

        let copied =
            copy_chunked(&mut data.as_slice(), &mut out, &recorder, Action::Download, true)
                .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(recorder.advanced.load(std::sync::atomic::Ordering::SeqCst), copied);
    }

    #[test]
    fn test_copy_stops_between_chunks() {
        let data = vec![1u8; HASH_CHUNK_SIZE * 4];
        let mut out = Vec::new();
        let recorder = Recorder::cancelling_after(HASH_CHUNK_SIZE as u64);

        let result =
            copy_chunked(&mut data.as_slice(), &mut out, &recorder, Action::Download, true);

        assert!(matches!(result, Err(ParcelError::Cancelled { .. })));
        assert_eq!(out.len(), HASH_CHUNK_SIZE);
    }

    #[test]
    fn test_checked_reader() {
        let recorder = Recorder::cancelling_after(0);
        let mut reader = CheckedReader::new(&b"abc"[..], &recorder);
        let mut buf = [0u8; 3];
        assert!(reader.read(&mut buf).is_err());

        let err =
            cancelled_or(&recorder, Action::Compress, ParcelError::io("x", io::Error::other("y")));
        assert!(matches!(err, ParcelError::Cancelled { .. }));
    }
}
