pub mod client_preview;
pub mod media;
pub mod template;
