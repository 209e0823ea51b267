use shipper::runtime::{boot, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (config, gateway) = boot::boot().await?;
    run::run(config, gateway).await
}
