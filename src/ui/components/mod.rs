mod form_panel;
mod input;
mod key_result;

pub use form_panel::{FormEvent, FormPanel};
pub use key_result::KeyResult;
