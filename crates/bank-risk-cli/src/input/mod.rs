pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Payload from `--input <path>` if given, otherwise from piped stdin.
pub fn read_payload<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_json(path);
    }
    match stdin::read_stdin()? {
        Some(data) => Ok(serde_json::from_value(data)?),
        None => Err(format!("{what} required: pass --input <file> or pipe JSON on stdin").into()),
    }
}
