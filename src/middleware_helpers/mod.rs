pub mod acting_user;
pub mod request_id;

pub use acting_user::{ActingUser, ACTING_USER_HEADER};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
