use mortimer::{Context, HandlerResult, RequestHandler, SetCookie, Settings, WebApplication};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Hello;

impl RequestHandler for Hello {
    fn get(&self, cx: &mut Context) -> HandlerResult {
        let name = cx.arg(0).unwrap_or("world").to_owned();
        let session = cx.session()?;
        let visits = session.get_as::<u64>("visits")?.unwrap_or(0) + 1;
        session.insert("visits", visits)?;

        cx.set_content_type("text/plain; charset=utf-8")?;
        Ok(format!("Hello, {name}! Visit number {visits}.").into())
    }
}

struct Login;

impl RequestHandler for Login {
    fn get(&self, _: &mut Context) -> HandlerResult {
        Ok(r#"<form method="post"><input name="user"><button>Log in</button></form>"#.into())
    }

    fn post(&self, cx: &mut Context) -> HandlerResult {
        let user = cx.post_args()?.get("user").unwrap_or_default().to_owned();
        cx.set_cookie(SetCookie::new(format!("user={user}")))?;
        cx.redirect(&format!("/hello/{user}"))
    }
}

struct Logout;

impl RequestHandler for Logout {
    fn get(&self, cx: &mut Context) -> HandlerResult {
        cx.session()?.delete();
        cx.redirect("/")
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mortimer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load_from("mortimer")?;
    let addr = settings.socket_addr()?;

    let mut app = WebApplication::from_settings(settings)?;
    app.router_mut()
        .add_route(r"/$", Hello)?
        .add_route(r"/hello/(\w+)/?$", Hello)?
        .add_route(r"/login/?$", Login)?
        .add_route(r"/logout/?$", Logout)?;

    app.run(addr)?;
    Ok(())
}
