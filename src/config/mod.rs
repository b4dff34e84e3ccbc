mod settings;

pub use settings::{DispatchSettings, EmailSettings, Settings};
