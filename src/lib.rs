mod app;
pub mod config;
mod context;
mod cookie;
mod error;
pub mod form;
pub mod multipart;
mod request;
mod router;
mod server;
pub mod session;
mod status;
mod view;

pub use app::WebApplication;
pub use crate::config::Settings;
pub use context::Context;
pub use cookie::SetCookie;
pub use error::{BoxError, Error};
pub use request::Request;
pub use router::{
    routes::{Args, HandlerResult, RequestHandler, Route},
    Router, RouterError,
};
pub use server::Server;
pub use session::{Session, SessionStore};
pub use status::status_line;
pub use view::{View, ViewError};
