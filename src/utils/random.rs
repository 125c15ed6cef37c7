use rand::{distributions::Alphanumeric, Rng};

pub fn rand_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Nickname for sessions the caller did not name.
pub fn nickname() -> String {
    format!("i2psam-{}", rand_string(8))
}

/// Id for a subsession of a PRIMARY session.
pub fn subsession_id() -> String {
    format!("sessid-{}", rand_string(16))
}
