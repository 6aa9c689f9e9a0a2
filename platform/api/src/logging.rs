use std::str::FromStr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Default,
    Json,
    Pretty,
    Compact,
}

pub fn init(level: &str, mode: Mode) -> Result<()> {
    let filter = EnvFilter::from_str(level)?;

    let builder = tracing_subscriber::fmt()
        .with_line_number(true)
        .with_file(true)
        .with_env_filter(filter);

    match mode {
        Mode::Default => builder.try_init(),
        Mode::Json => builder.json().try_init(),
        Mode::Pretty => builder.pretty().try_init(),
        Mode::Compact => builder.compact().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to init logger: {e}"))?;

    Ok(())
}
