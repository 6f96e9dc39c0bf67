fn main() {
    if let Err(err) = mmdc_runner::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
