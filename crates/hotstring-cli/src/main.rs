fn main() {
    hotstring_cli::run_main();
}
