fn main() {
    if let Err(err) = gridrecon::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
