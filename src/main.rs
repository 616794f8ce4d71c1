fn main() -> anyhow::Result<()> {
    webplayer_bridge::run()
}
