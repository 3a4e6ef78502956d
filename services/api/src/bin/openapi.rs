//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the REST API. The output path defaults to
//! `openapi.json` and can be overridden by the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    std::fs::write(&path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("OpenAPI specification written to {}", path);
    Ok(())
}
