pub mod confirm;

pub use confirm::{
    completion_prompt, confirm_disk_by_name, noninteractive, CompletionAction,
};
