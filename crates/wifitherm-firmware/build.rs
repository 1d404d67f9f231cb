fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");

    // A missing .env is fine as long as the variables come from the environment.
    let _ = dotenvy::dotenv();

    for key in ["WIFI_SSID", "WIFI_PASSWORD"] {
        match std::env::var(key) {
            Ok(value) => println!("cargo:rustc-env={key}={value}"),
            Err(_) => {
                println!("cargo:warning={key} is not set; the node will not join a network");
                println!("cargo:rustc-env={key}=");
            }
        }
    }

    // esp-hal linker script
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
