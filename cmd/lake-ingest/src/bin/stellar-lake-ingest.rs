fn main() {
    stellar_lake_ingest::cli::main();
}
