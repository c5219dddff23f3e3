//! Binary entrypoint for `appstage`.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = appstage_app::run().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
