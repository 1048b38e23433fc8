fn main() {
    let err = cmdgate::cli::run_gate();
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}
