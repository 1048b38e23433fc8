use anyhow::Result;

fn main() -> Result<()> {
    cmdgate::cli::run_ctl()
}
