use parley::interrupt;

#[tokio::main]
async fn main() {
    if let Err(e) = parley::cli::run().await {
        if e.downcast_ref::<interrupt::InterruptedError>().is_some() {
            std::process::exit(130);
        }
        eprintln!("{:#}", e); // pretty anyhow chain
        std::process::exit(1);
    }
}
