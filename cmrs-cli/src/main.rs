fn main() -> anyhow::Result<()> {
    cmrs_cli::run()
}
