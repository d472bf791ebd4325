//! services/api/src/bin/openapi.rs
//!
//! Exports the QuickScan OpenAPI document so the browser client can be checked
//! against it. Usage: `openapi [OUTPUT]`, default `openapi.json`.

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&output, document)?;
    println!("Wrote the QuickScan API document to {}", output.display());
    Ok(())
}
