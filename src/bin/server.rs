extern crate chombo;

use tokio::try_join;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = chombo::init_env()?;
    try_join!(chombo::run_server(config)).map(|_| ())
}
