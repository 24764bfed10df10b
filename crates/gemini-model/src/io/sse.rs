use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only `data` fields are understood. Carriage returns are dropped on the
/// way in, so both `\n\n` and `\r\n\r\n` terminate an event.
pub struct Sse {
    buf: String,
    // Trailing bytes of an incomplete UTF-8 sequence from the last chunk.
    pending: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Events already buffered are served before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                if !self.pending.is_empty() {
                    return Err(Error::InvalidPayload);
                }
                return Ok(None);
            };
            self.pending.extend_from_slice(&bytes);
            self.decode_pending()?;
        }
    }

    fn decode_pending(&mut self) -> Result<(), Error> {
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => return Err(Error::InvalidPayload),
        };
        let rest = self.pending.split_off(valid_up_to);
        let decoded = std::mem::replace(&mut self.pending, rest);
        let decoded =
            String::from_utf8(decoded).map_err(|_| Error::InvalidPayload)?;
        self.buf.extend(decoded.chars().filter(|c| *c != '\r'));
        Ok(())
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // event         = *( comment / field ) end-of-line
            // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
            let Some(eol_idx) = self.buf.find("\n\n") else {
                return Ok(None);
            };

            let mut data: Option<String> = None;
            for line in self.buf[..eol_idx].split('\n') {
                if line.starts_with(':') {
                    // Comment line.
                    continue;
                }
                let (name, value) = line.split_once(':').unwrap_or((line, ""));
                let value = value.strip_prefix(' ').unwrap_or(value);
                if name != "data" {
                    // Other fields are not supported.
                    return Err(Error::InvalidPayload);
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }

            // Consume the bytes from the buffer.
            self.buf.drain(0..eol_idx + 2);

            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().copied().map(Bytes::from_static).collect();
        Sse::new(Chunks::from_vec_deque(chunks))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_several_events_in_one_chunk() {
        let mut sse = sse_from(&[b"data: a\n\ndata: b\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "b");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_and_json_payload() {
        let mut sse = sse_from(&[
            b"data: {\"text\": \"a: b\"}\r\n",
            b"\r\n",
        ]);
        assert_eq!(
            sse.next_event().await.unwrap().unwrap(),
            "{\"text\": \"a: b\"}"
        );
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8_sequence() {
        // "è" is 0xC3 0xA8.
        let mut sse = sse_from(&[b"data: perch\xC3", b"\xA8\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "perchè");
    }

    #[tokio::test]
    async fn test_comments_are_skipped() {
        let mut sse = sse_from(&[b": keep-alive\n\ndata: x\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut sse = sse_from(&[b"xxxxxx\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let mut sse = sse_from(&[b"xxxxxx\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: \xFF\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let mut sse = sse_from(&[b"data: \xC3"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
