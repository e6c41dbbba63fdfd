//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the study tracker API to disk, for the
//! frontend's client generator. Usage: `openapi [OUTPUT]` (default `openapi.json`).

use api_lib::web::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let doc = ApiDoc::openapi();
    let route_count = doc.paths.paths.len();
    std::fs::write(&output, doc.to_pretty_json()?)?;

    println!(
        "Wrote OpenAPI document with {} paths to {}",
        route_count,
        output.display()
    );
    Ok(())
}
