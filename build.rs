use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/context/libcontext.c");

    cc::Build::new()
        .file("src/context/libcontext.c")
        .compile("libcontext");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let context_bindings = bindgen::Builder::default()
        .header("src/context/libcontext.h")
        .allowlist_function("(jump|make)_fcontext")
        .allowlist_type("fcontext_t")
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate()
        .expect("failed to generate libcontext bindings");
    context_bindings
        .write_to_file(out_dir.join("libcontext.rs"))
        .expect("failed to write libcontext bindings");
}
