fn main() -> battledex::error::Result<()> {
    battledex::main()
}
