mod command_input;
mod confirm;
mod form;
mod input;
mod key_result;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::ConfirmPrompt;
pub use form::{FormEvent, FormPopup};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
