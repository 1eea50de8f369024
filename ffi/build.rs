fn main() {
    let crate_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    println!("cargo:rerun-if-changed=src");

    // A header failure must not break the library build.
    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("BT_FFI_H")
        .generate()
    {
        Ok(bindings) => bindings,
        Err(e) => {
            println!("cargo:warning=cbindgen skipped: {e}");
            return;
        }
    };

    let include_dir = format!("{crate_dir}/include");
    if let Err(e) = std::fs::create_dir_all(&include_dir) {
        println!("cargo:warning=cannot create {include_dir}: {e}");
        return;
    }
    let header = format!("{include_dir}/bt_ffi.h");
    if !bindings.write_to_file(&header) {
        // Unchanged headers are not rewritten, so only a missing file is a failure.
        if !std::path::Path::new(&header).exists() {
            println!("cargo:warning=failed to write {header}");
        }
    }
}
