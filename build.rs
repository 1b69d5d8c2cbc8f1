fn main() {
    // Runtime configuration loads the .env file itself (see src/config.rs); the build
    // script only needs to trigger a rebuild when it changes.
    println!("cargo:rerun-if-changed=.env");
}
