mod cert_map;

pub use cert_map::*;
