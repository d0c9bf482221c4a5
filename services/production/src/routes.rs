use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/boms/:bom_id/tree", post(generate_tree).get(get_tree))
        .route("/boms/:bom_id/latest-version", get(get_latest_version))
        .route("/boms/:bom_id/versions", post(create_version))
        .route("/boms/:bom_id/personalize", post(personalize))
        .route("/boms/:bom_id/file-name", get(get_file_name))
        .route("/products/:product_id/boms", get(get_product_boms))
}
