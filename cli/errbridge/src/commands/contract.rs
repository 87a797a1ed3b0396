//! `errbridge contract` — print the callback layout native code must follow.

use anyhow::{bail, Result};
use errbridge_core::RegistrationContract;

/// Render the current contract as `text` or `json`.
pub fn render(format: &str) -> Result<String> {
    let contract = RegistrationContract::current();
    match format {
        "text" => Ok(contract.render_text()),
        "json" => Ok(serde_json::to_string_pretty(&contract)?),
        other => bail!("unknown format '{other}' (expected text or json)"),
    }
}

pub fn run(format: &str) -> Result<()> {
    println!("{}", render(format)?);
    Ok(())
}
