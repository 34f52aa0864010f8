fn main() -> anyhow::Result<()> {
    ndvi_guard::cli_main::main()
}
