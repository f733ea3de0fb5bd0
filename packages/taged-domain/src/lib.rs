//! Pure note and tag rules shared by the repositories and the HTTP layer.

pub mod content;
pub mod layout;
pub mod score;
pub mod tags;
