pub mod xh;

use crate::domain::request::PreparedRequest;
use crate::io::HttpResponse;

/// Sends a prepared request and returns the response, whatever its status.
///
/// Only failures to obtain a response at all (unreachable host, broken
/// connection, missing tool) are errors.
pub trait Transport {
    type Error: std::error::Error + 'static;

    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn send(&self, request: &PreparedRequest) -> Result<HttpResponse, Self::Error> {
        (**self).send(request)
    }
}
