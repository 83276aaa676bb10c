//! Static pages. Their content lives in the templates; handlers only name them.

use axum::Json;

use yatube_types::api::StaticPageContext;

/// GET /about/author/
pub async fn author() -> Json<StaticPageContext> {
    Json(StaticPageContext {
        title: "About the author",
        template: "about/author.html",
    })
}

/// GET /about/tech/
pub async fn tech() -> Json<StaticPageContext> {
    Json(StaticPageContext {
        title: "Technologies",
        template: "about/tech.html",
    })
}
