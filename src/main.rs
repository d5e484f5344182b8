use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cfg = bnauth::config::Config::parse();
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(bnauth::run(cfg))
}
