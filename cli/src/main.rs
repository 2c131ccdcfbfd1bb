use anyhow::Result;

fn main() -> Result<()> {
    brickgraph_cli::run()
}
