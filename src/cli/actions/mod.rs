pub mod server;

use secrecy::SecretString;

/// Action parsed from the command line.
#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        frontend_url: String,
        admin_email: String,
        admin_password: SecretString,
        session_ttl_seconds: u64,
    },
}
