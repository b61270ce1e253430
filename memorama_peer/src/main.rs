mod net;
mod session;

use std::str::FromStr;

use memorama_core::Difficulty;

fn usage() -> ! {
    println!("Usage: memorama_peer host <PORT> [easy|medium|hard] | memorama_peer join <ADDR>");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let outcome = match args.get(1).map(String::as_str) {
        Some("host") if args.len() >= 3 => {
            let Ok(port) = args[2].parse() else { usage() };
            let difficulty = match args.get(3) {
                Some(name) => match Difficulty::from_str(name) {
                    Ok(difficulty) => difficulty,
                    Err(_) => usage(),
                },
                None => Difficulty::default(),
            };
            session::host(port, difficulty).await
        }
        Some("join") if args.len() >= 3 => session::join(&args[2]).await,
        _ => usage(),
    };

    if let Err(e) = outcome {
        eprintln!("connection failed: {e}");
        std::process::exit(1);
    }
}
