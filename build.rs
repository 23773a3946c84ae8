use std::env;

fn main() {
    // Version string shown by the CLI, overridable for packaged builds
    let version = env::var("ISOCOST_VERSION_OVERRIDE")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string()));
    println!("cargo:rustc-env=ISOCOST_VERSION={}", version);

    println!("cargo:rerun-if-env-changed=ISOCOST_VERSION_OVERRIDE");
    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=Cargo.toml");
}
