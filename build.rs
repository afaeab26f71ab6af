fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap();

    println!("cargo::rustc-check-cfg=cfg(use_fls_slot)");
    println!("cargo::rustc-check-cfg=cfg(use_tls_slot)");
    if target_os == "windows" {
        let force_tls = std::env::var("_JNI_ENV_CACHE_FORCE_TLS").is_ok();
        if force_tls {
            println!("cargo:rustc-cfg=use_tls_slot");
        } else {
            println!("cargo:rustc-cfg=use_fls_slot");
        }
    } else {
        println!("cargo:rustc-cfg=use_tls_slot");
    }

    println!("cargo:rerun-if-env-changed=_JNI_ENV_CACHE_FORCE_TLS");
}
