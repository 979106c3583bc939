use http::Method;
use hyper::body::Bytes;

use crate::{context::Context, error::Error};

/// The body a handler method responds with.
pub type HandlerResult = Result<Bytes, Error>;

/// Serves the requests of one route.
///
/// Implement the methods for the HTTP verbs the route supports. The request,
/// the route's capture groups and the response status, headers and session
/// are reached through the [`Context`]. Verbs left unimplemented fail with
/// [`Error::MethodNotImplemented`].
///
/// ```
/// use mortimer::{Context, HandlerResult, RequestHandler};
///
/// struct Greeter;
///
/// impl RequestHandler for Greeter {
///     fn get(&self, cx: &mut Context) -> HandlerResult {
///         let name = cx.arg(0).unwrap_or("World");
///         Ok(format!("Hello, {name}").into())
///     }
/// }
/// ```
pub trait RequestHandler: Send + Sync + 'static {
    fn get(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::GET))
    }

    fn post(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::POST))
    }

    fn put(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::PUT))
    }

    fn delete(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::DELETE))
    }

    fn head(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::HEAD))
    }

    fn patch(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::PATCH))
    }

    fn options(&self, _cx: &mut Context) -> HandlerResult {
        Err(Error::MethodNotImplemented(Method::OPTIONS))
    }

    /// Call the method matching the request's verb.
    fn handle_request(&self, cx: &mut Context) -> HandlerResult {
        let method = cx.method().clone();
        match method {
            Method::GET => self.get(cx),
            Method::POST => self.post(cx),
            Method::PUT => self.put(cx),
            Method::DELETE => self.delete(cx),
            Method::HEAD => self.head(cx),
            Method::PATCH => self.patch(cx),
            Method::OPTIONS => self.options(cx),
            other => Err(Error::MethodNotImplemented(other)),
        }
    }
}
