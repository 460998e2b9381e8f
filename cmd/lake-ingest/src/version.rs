pub const fn pkg() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub const fn git() -> &'static str {
    env!("GIT_REVISION")
}

pub fn long() -> String {
    format!("{} ({})", pkg(), git())
}
