//! Portal chooser.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::models::Portal;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub portals: [Portal; 3],
}

/// Landing page linking to the three portal logins.
pub async fn home() -> impl IntoResponse {
    HomeTemplate {
        portals: Portal::ALL,
    }
}
