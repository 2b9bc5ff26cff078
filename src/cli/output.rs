use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Prints `payload` as JSON/YAML, or hands it to `human` for plain text.
pub fn emit<T, F>(output: OutputFormat, payload: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(payload)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(payload)?);
        }
        OutputFormat::Human => human(payload),
    }
    Ok(())
}
