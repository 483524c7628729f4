/// Rendering: panels own the controls, plot owns the central view.
pub mod panels;
pub mod plot;
