pub mod annotator;
pub mod glyphs;
pub mod layout;
