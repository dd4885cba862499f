pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

pub struct Status {
    pub healthy: bool,
    pub version: String,
}

pub mod errors {
    /// The requested record does not exist.
    pub struct NotFound;

    /// This action is unauthorized.
    pub struct Forbidden;
}
