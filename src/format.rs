//! Output format types shared across modules.

#[derive(Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON
    Pretty,
    /// Compact JSON (one object per line)
    Json,
}
