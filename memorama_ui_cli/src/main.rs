mod cli_game;
mod store;

use cli_game::CliGame;
use store::SaveStore;

fn main() {
    env_logger::init();
    let store = match SaveStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("cannot open the save directory: {e}");
            std::process::exit(1);
        }
    };
    CliGame::new(store).run();
}
