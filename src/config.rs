//! Server configuration, read from flags or environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::ledger::DEFAULT_VALIDATION_WINDOW;

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Address to listen on.
    #[arg(long, env = "STAR_NOTARY_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory for `block_<height>.json` files; volatile when unset.
    #[arg(long, env = "STAR_NOTARY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Seconds a challenge stays redeemable.
    #[arg(
        long,
        env = "STAR_NOTARY_VALIDATION_WINDOW",
        default_value_t = DEFAULT_VALIDATION_WINDOW,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub validation_window_secs: i64,
}
