#[tokio::main]
async fn main() {
    if let Err(e) = osgb_lib::run().await {
        eprintln!("osgb: {e}");
        std::process::exit(1);
    }
}
