fn main() {
    if let Err(err) = book_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
