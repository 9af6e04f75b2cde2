#[tokio::main]
async fn main() {
    if let Err(e) = oncodesk::run().await {
        eprintln!("oncodesk: {e}");
        std::process::exit(1);
    }
}
