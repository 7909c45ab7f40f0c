fn main() -> namechain_node::Result<()> {
    namechain_node::run()
}
