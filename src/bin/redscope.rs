//! redscope - live red-pixel camera viewer

fn main() -> anyhow::Result<()> {
    redscope::cli::run()
}
