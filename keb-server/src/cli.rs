use clap::Parser;

/// Kyma environment broker - runtime lifecycle over OSB
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// API port (overrides SERVER_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Disable suspension/unsuspension processing; updates become no-ops
    #[arg(long)]
    pub disable_update_processing: bool,
}
