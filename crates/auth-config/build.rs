fn main() {
    // option_env!() values are cached by cargo unless it knows to watch them.
    println!("cargo:rerun-if-env-changed=GOAUTH_API_URL");
}
