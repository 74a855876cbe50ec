use std::path::PathBuf;

// Windows builds link against Packet.lib / wpcap.lib from the Npcap SDK.
// They are looked up in `<workspace>/lib` unless LIBPCAP_LIBDIR points elsewhere.
fn main() {
    println!("cargo:rerun-if-env-changed=LIBPCAP_LIBDIR");

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let lib_path = match std::env::var("LIBPCAP_LIBDIR") {
        Ok(value) => PathBuf::from(value),
        Err(_) => {
            let manifest_dir = match std::env::var("CARGO_MANIFEST_DIR") {
                Ok(value) => PathBuf::from(value),
                Err(err) => {
                    eprintln!("The CARGO_MANIFEST_DIR environment variable is not set: {err}");
                    std::process::exit(1);
                },
            };

            match manifest_dir.parent() {
                Some(workspace_root) => workspace_root.join("lib"),
                None => {
                    eprintln!("Failed to get workspace directory");
                    std::process::exit(1);
                },
            }
        },
    };

    println!("cargo:rustc-link-search=native={}", lib_path.display());
}
