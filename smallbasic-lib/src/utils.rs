//! contains small utility functions that have nowhere else to go

/// returns the crate version
pub fn get_version() -> [u16; 3] {
    let version_str = env!("CARGO_PKG_VERSION");
    version_str
        .split('.')
        .map(|x| {
            x.parse::<u16>()
                .expect("invalid version string, can't parse elems as u16")
        })
        .collect::<Vec<_>>()
        .try_into()
        .expect("Invalid version string (wrong number of dots, expected two)")
}

/// Used for states that can only be reached through a mistake in the compiler itself,
/// never through a malformed program
macro_rules! bug {
    ($msg:literal $(, $args:expr)*) => {
       panic!(concat!("A compiler bug occured:\n\n", $msg) $(, $args)*)
    };
}

pub(crate) use bug;
