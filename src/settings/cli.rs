use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "keel", about = "Token, lock and lifecycle service")]
pub struct Cli {
    /// Path to a TOML settings file; environment variables prefixed `KEEL__` override it.
    #[arg(long)]
    pub settings: Option<String>,
}
