pub mod attendance;
pub mod office_location;
pub mod role;
pub mod user;
