use std::process::exit;

fn main() {
    if let Err(e) = costume_gallery::app::run_cli() {
        eprintln!("error: {e}");
        exit(1);
    }
}
