use std::path::PathBuf;

// These helpers are only used when the pe-filter-sdk feature is enabled
#[allow(dead_code)]
/// Print a boxed error message for visibility in cargo output
fn print_env_error(title: &str, details: &[&str], fixes: &[&str]) {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║ PE_FILTER BUILD ERROR: {:<42} ║", title);
    eprintln!("╠══════════════════════════════════════════════════════════════════╣");
    for detail in details {
        eprintln!("║ {:<66} ║", detail);
    }
    eprintln!("╠══════════════════════════════════════════════════════════════════╣");
    eprintln!("║ HOW TO FIX:                                                      ║");
    for fix in fixes {
        eprintln!("║   {:<64} ║", fix);
    }
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();
}

#[allow(dead_code)]
/// Check common SDK installation paths
fn find_sdk_lib() -> Option<PathBuf> {
    let candidates = [
        "C:\\Program Files\\Photon etc\\PHySpecV2\\Bin\\x64",
        "C:\\Program Files (x86)\\Photon etc\\PE_Filter_SDK\\lib",
        "/opt/photonetc/pe_filter/lib",
        "/usr/local/lib",
    ];

    for path in &candidates {
        let p = PathBuf::from(path);
        if p.join("PE_Filter_SDK.lib").exists() || p.join("libPE_Filter_SDK.so").exists() {
            return Some(p);
        }
    }
    None
}

fn main() {
    // Only emit link directives when the SDK is requested, so the crate
    // compiles (declarations only) on machines without the vendor library.
    #[cfg(feature = "pe-filter-sdk")]
    {
        use std::env;

        println!("cargo:rerun-if-env-changed=PE_FILTER_SDK_DIR");
        println!("cargo:rerun-if-env-changed=PE_FILTER_LIB_DIR");

        let lib_dir = match env::var("PE_FILTER_LIB_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => match env::var("PE_FILTER_SDK_DIR") {
                Ok(dir) => PathBuf::from(dir).join("lib"),
                Err(_) => {
                    if let Some(found) = find_sdk_lib() {
                        println!(
                            "cargo:warning=PE_FILTER_SDK_DIR not set, auto-detected: {}",
                            found.display()
                        );
                        found
                    } else {
                        print_env_error(
                            "PE_FILTER_SDK_DIR not set",
                            &[
                                "The pe-filter-sdk feature requires the PE_Filter SDK.",
                                "This variable tells the linker where PE_Filter_SDK lives.",
                            ],
                            &[
                                "set PE_FILTER_SDK_DIR=C:\\path\\to\\PE_Filter_SDK",
                                "or set PE_FILTER_LIB_DIR to the directory of the .lib/.so",
                            ],
                        );
                        panic!("PE_FILTER_SDK_DIR environment variable must be set when `pe-filter-sdk` feature is enabled.");
                    }
                }
            },
        };

        if !lib_dir.exists() {
            println!(
                "cargo:warning=PE_Filter lib path does not exist: {}",
                lib_dir.display()
            );
            println!("cargo:warning=Linker will search standard paths");
        }

        println!("cargo:rustc-link-search=native={}", lib_dir.display());
        println!("cargo:rustc-link-lib=dylib=PE_Filter_SDK");
    }
    #[cfg(not(feature = "pe-filter-sdk"))]
    {
        println!("cargo:rerun-if-changed=build.rs");
    }
}
