use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// Errors raised by a [`ModelProvider`] or by its responses.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the failure.
    fn kind(&self) -> ErrorKind;
}

/// A client of one hosted text-generation service.
///
/// Credentials and endpoints are fixed at construction time and requests
/// share no state. Every request is a single attempt with no retry and no
/// timeout of its own.
pub trait ModelProvider: Send + Sync {
    /// Failure of a request or of its response stream.
    type Error: ModelProviderError;

    /// The streamed reply.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a request. The returned future resolves once the service
    /// has accepted it, before any text is read.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
