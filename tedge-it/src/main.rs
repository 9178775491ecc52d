use tedge_it::run_cli;
use tedge_it::util::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info");
    run_cli().await
}
