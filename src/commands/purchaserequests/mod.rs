pub mod create_reorder_request_command;

pub use create_reorder_request_command::{
    generate_request_number, CreateReorderRequestCommand, ReorderRequestCreated,
};
