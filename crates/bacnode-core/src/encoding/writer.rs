use crate::EncodeError;

/// Bounds-checked cursor over a caller-owned transmit buffer.
///
/// Every encode step advances the cursor and returns an error instead of
/// overwriting earlier bytes or running past the end. A responder building a
/// reply hands collaborators a length-capped [`sub_window`](Self::sub_window)
/// to write payload bytes in place, then [`commit`](Self::commit)s what they
/// wrote; an abandoned encode attempt is discarded with
/// [`rewind_to`](Self::rewind_to).
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Roll the cursor back to `mark`, abandoning everything written after it.
    ///
    /// `mark` must be a position previously returned by
    /// [`position`](Self::position).
    pub fn rewind_to(&mut self, mark: usize) -> Result<(), EncodeError> {
        if mark > self.pos {
            return Err(EncodeError::BadLength);
        }
        self.pos = mark;
        Ok(())
    }

    /// Borrow the next `max_len` unwritten bytes as a fresh bounded window.
    ///
    /// The window starts at the current position but does not advance it;
    /// after a collaborator has filled part of the window, pass the length it
    /// wrote to [`commit`](Self::commit).
    pub fn sub_window(&mut self, max_len: usize) -> Result<Writer<'_>, EncodeError> {
        if self.remaining() < max_len {
            return Err(EncodeError::BufferFull);
        }
        let start = self.pos;
        Ok(Writer::new(&mut self.buf[start..start + max_len]))
    }

    /// Advance the cursor past `len` bytes written through a sub-window.
    pub fn commit(&mut self, len: usize) -> Result<(), EncodeError> {
        if len > self.remaining() {
            return Err(EncodeError::BufferFull);
        }
        self.pos += len;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        if self.remaining() < 1 {
            return Err(EncodeError::BufferFull);
        }
        self.buf[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if self.remaining() < data.len() {
            return Err(EncodeError::BufferFull);
        }
        let end = self.pos + data.len();
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn write_be_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }

    pub fn write_be_u32(&mut self, value: u32) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use crate::EncodeError;

    #[test]
    fn writes_advance_the_cursor() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        w.write_u8(0xAA).unwrap();
        w.write_be_u16(0x0102).unwrap();
        assert_eq!(w.as_written(), &[0xAA, 0x01, 0x02]);
        assert_eq!(w.remaining(), 5);
    }

    #[test]
    fn write_past_end_is_refused() {
        let mut buf = [0u8; 2];
        let mut w = Writer::new(&mut buf);
        w.write_all(&[1, 2]).unwrap();
        assert_eq!(w.write_u8(3).unwrap_err(), EncodeError::BufferFull);
        assert_eq!(w.as_written(), &[1, 2]);
    }

    #[test]
    fn sub_window_is_capped_and_commit_advances() {
        let mut buf = [0u8; 10];
        let mut w = Writer::new(&mut buf);
        w.write_u8(0xFF).unwrap();

        let mut window = w.sub_window(4).unwrap();
        window.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(window.write_be_u16(9).unwrap_err(), EncodeError::BufferFull);
        let used = window.position();

        w.commit(used).unwrap();
        assert_eq!(w.as_written(), &[0xFF, 1, 2, 3]);
    }

    #[test]
    fn rewind_discards_a_failed_attempt() {
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        w.write_u8(1).unwrap();
        let mark = w.position();
        w.write_all(&[2, 3, 4]).unwrap();
        w.rewind_to(mark).unwrap();
        assert_eq!(w.as_written(), &[1]);
        assert!(w.rewind_to(5).is_err());
    }
}
