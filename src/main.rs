fn main() -> anyhow::Result<()> {
    inkboard::run()
}
