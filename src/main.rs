fn main() {
    if let Err(error) = framecast::run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
