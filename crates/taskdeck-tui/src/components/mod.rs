pub mod button;
pub mod input;
pub mod spinner;

pub use button::{Button, ButtonVariant};
pub use input::TextInput;
pub use spinner::Spinner;
