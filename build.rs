use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../config.template.toml");

    let template = include_str!("src/config.template.toml");

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/config.template.toml");
}
