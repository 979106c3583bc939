pub mod routes;

use std::sync::Arc;

use routes::{Args, RequestHandler, Route};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid route pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// An ordered table of routes. The first route whose pattern matches a path
/// serves it.
///
/// ```
/// use mortimer::{Context, HandlerResult, RequestHandler, Router};
///
/// struct Index;
///
/// impl RequestHandler for Index {
///     fn get(&self, _: &mut Context) -> HandlerResult {
///         Ok("index".into())
///     }
/// }
///
/// let mut router = Router::new();
/// router.add_route(r"/$", Index).unwrap();
/// assert!(router.find_route("/").is_some());
/// assert!(router.find_route("/missing").is_none());
/// ```
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Its pattern is compiled once, here.
    pub fn add_route<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouterError>
    where
        H: RequestHandler,
    {
        self.add_shared_route(pattern, Arc::new(handler))
    }

    /// Append a route whose handler may also serve other routes.
    pub fn add_shared_route(
        &mut self,
        pattern: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<&mut Self, RouterError> {
        let route = Route::new(pattern, handler).map_err(|source| RouterError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        tracing::trace!(%route, "route added");
        self.routes.push(route);
        Ok(self)
    }

    /// Append routes in order. Stops at the first invalid pattern, keeping
    /// the routes added before it.
    pub fn add_route_list<'a, I>(&mut self, routes: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = (&'a str, Arc<dyn RequestHandler>)>,
    {
        for (pattern, handler) in routes {
            self.add_shared_route(pattern, handler)?;
        }
        Ok(self)
    }

    /// Find the handler for `path` along with the route's capture groups.
    pub fn find_route(&self, path: &str) -> Option<(Arc<dyn RequestHandler>, Args)> {
        self.routes.iter().find_map(|route| {
            route
                .matches(path)
                .map(|args| (Arc::clone(&route.handler), args))
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
