fn main() -> hnscan_node::Result<()> {
    hnscan_node::run()
}
