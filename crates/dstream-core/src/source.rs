//! The chunk source capability
//!
//! Every reader, whether backed by a file, a UDP socket or a raw capture
//! socket, is driven the same way: allocate one buffer of `chunk_size()`
//! bytes, then call `read_into` until done.
//!
//! ```ignore
//! let mut buf = source.chunk_buffer();
//! loop {
//!     match source.read_into(&mut buf) {
//!         Ok(0) => break,               // EOF for files, interrupted for sockets
//!         Ok(n) => process(&buf[..n]),
//!         Err(e) if e.is_recoverable() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! ```

use crate::error::StreamResult;

/// A continuous source of bounded-size byte chunks.
///
/// Implementations are single-caller: no internal locking, at most one
/// thread drives a given instance at a time. Independent instances may
/// live on separate threads.
pub trait StreamSource: Send {
    /// Read up to `chunk_size()` bytes into `buf`.
    ///
    /// Returns the number of valid bytes written, in `0..=chunk_size()`.
    /// For files 0 means end-of-stream. For sockets 0 means the blocking
    /// receive was interrupted by a signal; sockets have no natural end.
    ///
    /// # Panics
    ///
    /// `buf` must hold at least `chunk_size()` bytes. Shorter buffers are a
    /// caller bug and panic on the slice bound.
    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize>;

    /// Configured chunk size, fixed at construction
    fn chunk_size(&self) -> usize;

    /// Human-readable reader description for logs
    fn type_tag(&self) -> String {
        "<UNK>".to_string()
    }

    /// Allocate a zeroed buffer sized for this source
    fn chunk_buffer(&self) -> Vec<u8> {
        vec![0u8; self.chunk_size()]
    }
}

impl<S: StreamSource + ?Sized> StreamSource for Box<S> {
    #[inline]
    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        (**self).read_into(buf)
    }

    #[inline]
    fn chunk_size(&self) -> usize {
        (**self).chunk_size()
    }

    fn type_tag(&self) -> String {
        (**self).type_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits `total` bytes of a counting pattern, `chunk` at a time
    struct Counting {
        chunk: usize,
        total: usize,
        pos: usize,
    }

    impl StreamSource for Counting {
        fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
            let n = self.chunk.min(self.total - self.pos);
            for (i, b) in buf[..n].iter_mut().enumerate() {
                *b = ((self.pos + i) % 251) as u8;
            }
            self.pos += n;
            Ok(n)
        }

        fn chunk_size(&self) -> usize {
            self.chunk
        }
    }

    #[test]
    fn test_default_type_tag() {
        let s = Counting { chunk: 4, total: 0, pos: 0 };
        assert_eq!(s.type_tag(), "<UNK>");
    }

    #[test]
    fn test_chunk_buffer_size() {
        let s = Counting { chunk: 9000, total: 0, pos: 0 };
        assert_eq!(s.chunk_buffer().len(), 9000);
    }

    #[test]
    fn test_boxed_dispatch() {
        let mut s: Box<dyn StreamSource> = Box::new(Counting { chunk: 3, total: 7, pos: 0 });
        let mut buf = s.chunk_buffer();
        let mut sizes = Vec::new();
        loop {
            let n = s.read_into(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            sizes.push(n);
        }
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(s.chunk_size(), 3);
    }
}
