#[cfg(test)]
use std::collections::VecDeque;

use bytes::Bytes;
use reqwest::Response;

/// Reading the body failed mid-way, usually a dropped connection.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(pub String);

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error(err.to_string())
    }
}

/// A response body consumed one network chunk at a time.
pub enum Chunks {
    Http(Response),
    #[cfg(test)]
    Canned(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Http(response)
    }

    #[cfg(test)]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Canned(chunks)
    }

    /// Returns `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        let chunk = match self {
            Chunks::Http(response) => response.chunk().await?,
            #[cfg(test)]
            Chunks::Canned(chunks) => chunks.pop_front(),
        };
        Ok(chunk)
    }
}
