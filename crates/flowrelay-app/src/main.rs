#![forbid(unsafe_code)]

//! Binary entrypoint for the `flowrelay` command.

use std::process;

#[tokio::main]
async fn main() {
    let code = flowrelay_app::run().await;
    process::exit(code);
}
