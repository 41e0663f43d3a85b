mod account;
pub use account::*;
mod download_status;
pub use download_status::*;
mod interaction_task;
pub use interaction_task::*;
mod progress;
pub use progress::*;
mod settings;
pub use settings::*;
