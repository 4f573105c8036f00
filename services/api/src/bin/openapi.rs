//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3.0 document of the REST API to the path given as the
//! first argument, `openapi.json` when none is given.
//!
//! ```text
//! cargo run --bin openapi -- docs/study-hub.json
//! ```

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, ApiDoc::openapi().to_pretty_json()?)?;
    println!("OpenAPI specification generated at {}", path.display());
    Ok(())
}
