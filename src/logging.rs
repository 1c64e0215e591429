//! Canister log output.
//!
//! `ic_cdk::println!` only works inside a canister; native unit test builds
//! print to stderr instead.

macro_rules! log {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        ic_cdk::println!($($arg)*);
        #[cfg(not(target_arch = "wasm32"))]
        eprintln!($($arg)*);
    }};
}
