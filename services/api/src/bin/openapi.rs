//! services/api/src/bin/openapi.rs
//!
//! Prints the OpenAPI document of the task board API.
//!
//! Usage: `openapi [PATH]`. Without a path the document goes to `openapi.json`;
//! a path of `-` writes it to stdout.

use api_lib::web::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi().to_pretty_json()?;

    match std::env::args().nth(1).as_deref() {
        Some("-") => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
        path => {
            let path = path.unwrap_or(DEFAULT_PATH);
            std::fs::write(path, document)?;
            eprintln!("OpenAPI document written to {}", path);
        }
    }
    Ok(())
}
