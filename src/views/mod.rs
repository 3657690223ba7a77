use rocket::{catch, catchers, Catcher, Request};

pub mod api;

#[catch(404)]
fn not_found(req: &Request<'_>) -> String {
    format!("Nothing lives at {}", req.uri().path())
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> String {
    format!("Couldn't make sense of {}", req.uri().path())
}

pub fn catchers() -> Vec<Catcher> {
    catchers![not_found, unprocessable]
}
