pub mod config_store;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod key_gate;
pub mod key_host;
pub mod launcher;
pub mod logging;
pub mod logo;
pub mod main_ui_html;
pub mod path_utils;
pub mod renderer;
pub mod server;
pub mod studio;

pub use error::{LogoError, Result};
pub use logo::{GeneratedLogo, GenerationPhase, LogoRequest, LogoStyle};
