fn main() -> anyhow::Result<()> {
    rdfgraph_cli::run()
}
