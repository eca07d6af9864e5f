fn main() {
    if let Err(e) = arxc_drv::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
